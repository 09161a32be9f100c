use crate::tag_scanner::find_all;

use log::debug;

const REQUEST_MARKERS: [&str; 3] = ["SaveRequest>", "InsertRequest>", "UpdateRequest>"];
const DEFAULT_APPLICATION: &str = "UNKNOWN";

/// Collects the `Data` payloads of save/insert/update requests into an AbaConnect batch import
/// document, one `<Transaction>` per payload.
#[derive(Debug, Clone)]
pub struct ImportFileBuilder {
    indent: String,
    line_terminator: String,
    application: String,
    transactions: String,
    transaction_count: usize,
}

impl ImportFileBuilder {
    pub fn new(indent: impl Into<String>, line_terminator: impl Into<String>) -> Self {
        ImportFileBuilder {
            indent: indent.into(),
            line_terminator: line_terminator.into(),
            application: DEFAULT_APPLICATION.to_owned(),
            transactions: String::new(),
            transaction_count: 0,
        }
    }

    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    /// Whether `xml` looks like an AbaConnect save, insert or update request.
    pub fn is_import_request(xml: &str) -> bool {
        REQUEST_MARKERS.iter().any(|marker| xml.contains(marker))
    }

    /// Appends one transaction per `Data` element of `xml` and returns how many were added.
    ///
    /// Envelopes that are not import requests are ignored.
    pub fn add_envelope(&mut self, xml: &str) -> usize {
        if !Self::is_import_request(xml) {
            return 0;
        }

        let mut added = 0;
        for payload in find_all("Data", xml, false) {
            self.push_line(2, "<Transaction>");
            self.push_line(3, payload.trim());
            self.push_line(2, "</Transaction>");
            added += 1;
        }

        debug!("added {} import transaction(s)", added);
        self.transaction_count += added;
        added
    }

    fn push_line(&mut self, level: usize, content: &str) {
        for _ in 0..level {
            self.transactions.push_str(&self.indent);
        }
        self.transactions.push_str(content);
        self.transactions.push_str(&self.line_terminator);
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// The collected `<Transaction>` blocks without the container around them.
    pub fn fragment(&self) -> &str {
        &self.transactions
    }

    /// The complete import document, `None` when no transaction was collected.
    pub fn document(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let lt = &self.line_terminator;
        let mut document = String::new();
        for line in [
            "<?xml version='1.0' encoding='UTF-8'?>",
            "<AbaConnectContainer>",
            "  <TaskCount>1</TaskCount>",
            "  <Task>",
            "    <Parameter>",
        ] {
            document.push_str(line);
            document.push_str(lt);
        }
        document.push_str(&format!(
            "      <Application>{}</Application>{}",
            self.application, lt
        ));
        for line in [
            "      <Id></Id>",
            "      <MapId>AbaDefault</MapId>",
            "      <Version>2010.00</Version>",
            "    </Parameter>",
        ] {
            document.push_str(line);
            document.push_str(lt);
        }

        document.push_str(&self.transactions);

        document.push_str("  </Task>");
        document.push_str(lt);
        document.push_str("</AbaConnectContainer>");
        document.push_str(lt);

        Some(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAVE: &str = "<SaveRequest>\n  <Data>\n    <Customer mode=\"SAVE\">\n      <Name>A</Name>\n    </Customer>\n  </Data>\n  <Data>\n    <Customer mode=\"SAVE\">\n      <Name>B</Name>\n    </Customer>\n  </Data>\n</SaveRequest>";

    #[test]
    fn test_ignores_non_import_envelopes() {
        let mut builder = ImportFileBuilder::new("  ", "\n");
        assert_eq!(builder.add_envelope("<Login><Data>1</Data></Login>"), 0);
        assert!(builder.is_empty());
        assert_eq!(builder.document(), None);
    }

    #[test]
    fn test_one_transaction_per_data_element() {
        let mut builder = ImportFileBuilder::new("  ", "\n");
        assert_eq!(builder.add_envelope(SAVE), 2);

        let expected = concat!(
            "    <Transaction>\n",
            "      <Customer mode=\"SAVE\">\n",
            "      <Name>A</Name>\n",
            "    </Customer>\n",
            "    </Transaction>\n",
            "    <Transaction>\n",
            "      <Customer mode=\"SAVE\">\n",
            "      <Name>B</Name>\n",
            "    </Customer>\n",
            "    </Transaction>\n",
        );
        assert_eq!(builder.fragment(), expected);
    }

    #[test]
    fn test_document_wraps_transactions() {
        let mut builder = ImportFileBuilder::new("  ", "\r\n").application("DEBI");
        builder.add_envelope("<InsertRequest><ns:Data><Row>1</Row></ns:Data></InsertRequest>");

        let document = builder.document().unwrap();
        let lines: Vec<&str> = document.split("\r\n").collect();
        assert_eq!(
            lines,
            vec![
                "<?xml version='1.0' encoding='UTF-8'?>",
                "<AbaConnectContainer>",
                "  <TaskCount>1</TaskCount>",
                "  <Task>",
                "    <Parameter>",
                "      <Application>DEBI</Application>",
                "      <Id></Id>",
                "      <MapId>AbaDefault</MapId>",
                "      <Version>2010.00</Version>",
                "    </Parameter>",
                "    <Transaction>",
                "      <Row>1</Row>",
                "    </Transaction>",
                "  </Task>",
                "</AbaConnectContainer>",
                "",
            ]
        );
        assert_eq!(builder.transaction_count(), 1);
    }
}
