use crate::envelope::{Envelope, MessageType};
use crate::notice::{Notice, NoticeKind};

use log::{debug, info, warn};
use serde::Serialize;

const ORDER_FACTOR: u32 = 10;
const REQUEST_OFFSET: u32 = 1;
const RESPONSE_OFFSET: u32 = 2;

/// Counts gathered while sequencing one capture log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SequenceSummary {
    pub requests: u32,
    pub responses: u32,
    pub unclassified: u32,
    /// Whether the envelopes were reordered into request/response pairs.
    pub sorted: bool,
}

/// Assigns order indexes to `envelopes` in capture order, then reorders them so that the n-th
/// request is directly followed by the n-th response.
///
/// The n-th request gets `n * 10 + 1`, the n-th response `n * 10 + 2`. Sorting only happens when
/// both requests and responses were seen. Unclassified envelopes never get an index; they keep
/// following the classified envelope they followed in the capture (leading ones stay first).
pub fn sequence_envelopes(envelopes: &mut Vec<Envelope>, notices: &mut Vec<Notice>) -> SequenceSummary {
    let mut summary = SequenceSummary::default();

    for envelope in envelopes.iter_mut() {
        match envelope.message_type() {
            MessageType::Request => {
                summary.requests += 1;
                envelope.set_order_index(summary.requests * ORDER_FACTOR + REQUEST_OFFSET);
            }
            MessageType::Response => {
                summary.responses += 1;
                envelope.set_order_index(summary.responses * ORDER_FACTOR + RESPONSE_OFFSET);
            }
            MessageType::Unknown => {
                summary.unclassified += 1;
                debug!("no message type for `{}`", envelope.body_name());
                notices.push(Notice::info(
                    NoticeKind::UnclassifiedMessage,
                    format!("NO Message Type for {} possible.", envelope.body_name()),
                ));
            }
        }
    }

    if summary.requests != summary.responses {
        warn!(
            "{} request(s) but {} response(s), pairing may be wrong",
            summary.requests, summary.responses
        );
        notices.push(Notice::warning(
            NoticeKind::InconsistentPairing,
            "Sorting of Request and Response Messages cannot be performed with uneven request and response counts !",
        ));
    }

    if summary.requests > 0 && summary.responses > 0 {
        sort_by_order_index(envelopes);
        summary.sorted = true;
    }

    info!(
        "sequenced {} request(s), {} response(s), {} unclassified",
        summary.requests, summary.responses, summary.unclassified
    );
    summary
}

fn sort_by_order_index(envelopes: &mut Vec<Envelope>) {
    let mut anchor: Option<u32> = None;
    let mut keyed: Vec<((Option<u32>, usize), Envelope)> = envelopes
        .drain(..)
        .enumerate()
        .map(|(position, envelope)| {
            if let Some(order_index) = envelope.order_index() {
                anchor = Some(order_index);
            }
            ((anchor, position), envelope)
        })
        .collect();

    // `None < Some(_)`, so leading unclassified envelopes stay in front.
    keyed.sort_by_key(|(key, _)| *key);
    envelopes.extend(keyed.into_iter().map(|(_, envelope)| envelope));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;
    use pretty_assertions::assert_eq;

    fn request(body: &str) -> Envelope {
        Envelope::new(
            format!("<s:Envelope><s:Body><{}/></s:Body></s:Envelope>", body),
            "POST /ws HTTP/1.1\r\n",
        )
    }

    fn response(body: &str) -> Envelope {
        Envelope::new(
            format!("<s:Envelope><s:Body><{}/></s:Body></s:Envelope>", body),
            "HTTP/1.1 200 OK\r\n",
        )
    }

    fn unknown(body: &str) -> Envelope {
        Envelope::new(
            format!("<s:Envelope><s:Body><{}/></s:Body></s:Envelope>", body),
            "",
        )
    }

    fn body_names(envelopes: &[Envelope]) -> Vec<&str> {
        envelopes.iter().map(|e| e.body_name()).collect()
    }

    #[test]
    fn test_alternating_capture_keeps_pairs_adjacent() {
        let mut envelopes = vec![
            request("Login"),
            response("LoginResponse"),
            request("Save"),
            response("SaveResponse"),
        ];
        let mut notices = vec![];

        let summary = sequence_envelopes(&mut envelopes, &mut notices);

        assert_eq!(
            body_names(&envelopes),
            vec!["Login", "LoginResponse", "Save", "SaveResponse"]
        );
        let indexes: Vec<Option<u32>> = envelopes.iter().map(|e| e.order_index()).collect();
        assert_eq!(indexes, vec![Some(11), Some(12), Some(21), Some(22)]);
        assert!(summary.sorted);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_responses_captured_late_are_paired() {
        let mut envelopes = vec![
            request("A"),
            request("B"),
            response("AResponse"),
            response("BResponse"),
        ];
        let mut notices = vec![];

        sequence_envelopes(&mut envelopes, &mut notices);

        assert_eq!(
            body_names(&envelopes),
            vec!["A", "AResponse", "B", "BResponse"]
        );
    }

    #[test]
    fn test_uneven_counts_warn_but_still_sort() {
        let mut envelopes = vec![request("A"), request("B"), response("AResponse")];
        let mut notices = vec![];

        let summary = sequence_envelopes(&mut envelopes, &mut notices);

        assert_eq!(body_names(&envelopes), vec!["A", "AResponse", "B"]);
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.responses, 1);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::InconsistentPairing);
        assert_eq!(notices[0].severity, Severity::Warning);
    }

    #[test]
    fn test_only_requests_are_not_sorted() {
        let mut envelopes = vec![request("B"), request("A")];
        let mut notices = vec![];

        let summary = sequence_envelopes(&mut envelopes, &mut notices);

        assert!(!summary.sorted);
        assert_eq!(body_names(&envelopes), vec!["B", "A"]);
        assert_eq!(envelopes[1].order_index(), Some(21));
    }

    #[test]
    fn test_unclassified_envelopes_follow_their_predecessor() {
        let mut envelopes = vec![
            unknown("Leading"),
            request("A"),
            request("B"),
            unknown("AfterB"),
            response("AResponse"),
            response("BResponse"),
        ];
        let mut notices = vec![];

        let summary = sequence_envelopes(&mut envelopes, &mut notices);

        assert_eq!(
            body_names(&envelopes),
            vec!["Leading", "A", "AResponse", "B", "AfterB", "BResponse"]
        );
        assert_eq!(summary.unclassified, 2);
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.kind == NoticeKind::UnclassifiedMessage));
        assert_eq!(notices[0].message, "NO Message Type for Leading possible.");
        assert_eq!(envelopes[0].order_index(), None);
    }

    #[test]
    fn test_empty_input() {
        let mut envelopes = vec![];
        let mut notices = vec![];
        let summary = sequence_envelopes(&mut envelopes, &mut notices);
        assert_eq!(summary, SequenceSummary::default());
        assert!(notices.is_empty());
    }
}
