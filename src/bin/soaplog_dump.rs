use anyhow::{Context, Result, bail, format_err};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use encoding::all::encodings;
use encoding::types::Encoding;
use indoc::indoc;
use log::Level;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use soaplog::{ExplodedLog, ImportMode, ParserSettings, RenderedEnvelope, SoapLogParser};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SoapLogOutputFormat {
    Xml,
    Json,
    JsonL,
}

struct SoapLogDump {
    parser_settings: ParserSettings,
    /// `None` reads the capture from stdin.
    input: Option<PathBuf>,
    show_envelope_number: bool,
    output_format: SoapLogOutputFormat,
    output: Box<dyn Write>,
    import_file: Option<PathBuf>,
    confirm_overwrite: bool,
    verbosity_level: Option<Level>,
}

/// Tries to write a line to a given target, aborts program if fails.
macro_rules! try_writeln {
    ($($arg:tt)*) => (
        match writeln!($($arg)*) {
            Ok(_) => {},
            Err(e) => {
                eprintln!("{}", &e);
                exit(1)
            }
        }
    );
}

impl SoapLogDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = match matches
            .get_one::<String>("INPUT")
            .map(String::as_str)
            .unwrap_or("-")
        {
            "-" => None,
            path => Some(PathBuf::from(path)),
        };

        let output_format = match matches.get_one::<String>("output-format").map(String::as_str) {
            Some("json") => SoapLogOutputFormat::Json,
            Some("jsonl") => SoapLogOutputFormat::JsonL,
            _ => SoapLogOutputFormat::Xml,
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than  -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        let codec_name = matches
            .get_one::<String>("ansi-codec")
            .map(String::as_str)
            .unwrap_or("windows-1252");
        let ansi_codec = *encodings()
            .iter()
            .find(|c| c.name() == codec_name)
            .ok_or_else(|| format_err!("Unknown ansi codec `{}`", codec_name))?;

        let import_mode = ImportMode::from_name(
            matches
                .get_one::<String>("import-mode")
                .map(String::as_str)
                .unwrap_or("none"),
        );

        let line_terminator = if matches.get_flag("lf") { "\n" } else { "\r\n" };

        let confirm_overwrite = !matches.get_flag("no-confirm-overwrite");

        let output: Box<dyn Write> = match matches.get_one::<String>("output-target") {
            Some(path) => Box::new(
                create_output_file(path, confirm_overwrite).with_context(|| {
                    format!("An error occurred while creating output file at `{}`", path)
                })?,
            ),
            None => Box::new(io::stdout()),
        };

        let import_file = matches.get_one::<String>("import-file").map(PathBuf::from);
        if import_file.is_some() && !import_mode.is_active() {
            eprintln!("`--import-file` has no effect without `--import-mode`");
        }

        Ok(SoapLogDump {
            parser_settings: ParserSettings::new()
                .reformat_xml(!matches.get_flag("no-reformat"))
                .strip_namespace_prefixes(!matches.get_flag("keep-namespace-prefixes"))
                .convert_extended_fields_to_xml(matches.get_flag("convert-extended-fields"))
                .output_soap_headers(matches.get_flag("soap-headers"))
                .import_mode(import_mode)
                .line_terminator(line_terminator)
                .ansi_codec(ansi_codec),
            input,
            show_envelope_number: output_format == SoapLogOutputFormat::Xml
                && !matches.get_flag("no-show-envelope-number"),
            output_format,
            output,
            import_file,
            confirm_overwrite,
            verbosity_level,
        })
    }

    /// Main entry point for `SoapLogDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let exploded = self.explode()?;
        let rendered = exploded.render(&self.parser_settings);

        for envelope in &rendered.envelopes {
            self.dump_envelope(envelope)?;
        }
        self.output.flush()?;

        if let (Some(path), Some(document)) = (&self.import_file, &rendered.import_document) {
            let mut file = create_output_file(path, self.confirm_overwrite).with_context(|| {
                format!("Failed to create import file at `{}`", path.display())
            })?;
            file.write_all(document.as_bytes())?;
        }

        for notice in &rendered.notices {
            eprintln!("{}", notice);
        }

        Ok(())
    }

    fn explode(&self) -> Result<ExplodedLog> {
        let exploded = match &self.input {
            Some(path) => SoapLogParser::from_path(path)?
                .with_configuration(self.parser_settings.clone())
                .explode(),
            None => SoapLogParser::from_reader(io::stdin().lock())
                .with_configuration(self.parser_settings.clone())
                .explode(),
        };

        let input_name = self
            .input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".to_owned());

        exploded.with_context(|| format!("Failed to read capture log {}", input_name))
    }

    fn dump_envelope(&mut self, envelope: &RenderedEnvelope) -> Result<()> {
        match self.output_format {
            SoapLogOutputFormat::Xml => {
                if self.show_envelope_number {
                    try_writeln!(
                        self.output,
                        "Envelope {} - {} {}",
                        envelope.sequence_number,
                        envelope.message_type,
                        envelope.body_name
                    );
                }
                try_writeln!(self.output, "{}", envelope.document);
            }
            SoapLogOutputFormat::Json => {
                try_writeln!(self.output, "{}", serde_json::to_string_pretty(envelope)?);
            }
            SoapLogOutputFormat::JsonL => {
                try_writeln!(self.output, "{}", serde_json::to_string(envelope)?);
            }
        }

        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            match TermLogger::init(
                level.to_level_filter(),
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                Ok(_) => {}
                Err(e) => eprintln!("Failed to initialize logging: {:?}", e),
            };
        }
    }
}

/// If `prompt` is passed, will display a confirmation prompt before overwriting files.
fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
    let p = path.as_ref();

    if p.is_dir() {
        bail!(
            "There is a directory at {}, refusing to overwrite",
            p.display()
        );
    }

    if p.exists() {
        if prompt {
            match Confirm::new()
                .with_prompt(format!(
                    "Are you sure you want to override output file at {}",
                    p.display()
                ))
                .default(false)
                .interact()
            {
                Ok(true) => Ok(File::create(p)?),
                Ok(false) => bail!("Cancelled"),
                Err(e) => bail!(
                    "Failed to write confirmation prompt to term caused by\n{}",
                    e
                ),
            }
        } else {
            Ok(File::create(p)?)
        }
    } else {
        // Ok to assume p is not an existing directory
        match p.parent() {
            Some(parent) => {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
                Ok(File::create(p)?)
            }
            None => bail!("Output file cannot be root."),
        }
    }
}

fn command() -> Command {
    let ansi_codecs: Vec<&'static str> = encodings()
        .iter()
        .filter(|&e| e.raw_decoder().is_ascii_compatible())
        .map(|e| e.name())
        .collect();

    Command::new("SOAP capture log exploder")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Splits TCPMon style capture logs into reformatted SOAP envelopes")
        .arg(
            Arg::new("INPUT")
                .value_name("INPUT")
                .help("Capture log to read, `-` (the default) reads from stdin."),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["xml", "json", "jsonl"])
                .default_value("xml")
                .help("Sets the output format")
                .long_help(indoc!(r#"
                    Sets the output format:
                        "xml"   - prints every envelope as an XML document.
                        "json"  - prints every envelope and its metadata as pretty JSON.
                        "jsonl" - same as json, one envelope per line.
                "#)),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("FILE")
                .help(indoc!("Writes output to the file specified instead of stdout, errors and notices will still be printed to stderr.
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`
                       Will create parent directories if needed.")),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("no-reformat")
                .long("no-reformat")
                .action(ArgAction::SetTrue)
                .help("When set, envelopes are printed as extracted instead of being reformatted."),
        )
        .arg(
            Arg::new("keep-namespace-prefixes")
                .long("keep-namespace-prefixes")
                .action(ArgAction::SetTrue)
                .help("When set, namespace prefixes of element names are kept."),
        )
        .arg(
            Arg::new("convert-extended-fields")
                .long("convert-extended-fields")
                .action(ArgAction::SetTrue)
                .help("Turns `ExtendedFields` name/value lists into plain elements (needs `--import-mode`)."),
        )
        .arg(
            Arg::new("soap-headers")
                .long("soap-headers")
                .action(ArgAction::SetTrue)
                .help("Appends the captured HTTP header to every envelope as an XML comment."),
        )
        .arg(
            Arg::new("import-mode")
                .long("import-mode")
                .value_parser(["none", "save", "insert", "update"])
                .default_value("none")
                .help("Adds the AbaConnect `mode` attribute to request data and enables `--import-file`."),
        )
        .arg(
            Arg::new("import-file")
                .long("import-file")
                .value_name("FILE")
                .help("Writes an AbaConnect import document built from the save/insert/update requests."),
        )
        .arg(
            Arg::new("lf")
                .long("lf")
                .action(ArgAction::SetTrue)
                .help("Uses `\\n` instead of `\\r\\n` as line terminator in the output documents."),
        )
        .arg(
            Arg::new("no-show-envelope-number")
                .long("dont-show-envelope-number")
                .action(ArgAction::SetTrue)
                .help("When set, `Envelope <n>` separators will not be printed."),
        )
        .arg(
            Arg::new("ansi-codec")
                .long("ansi-codec")
                .value_parser(PossibleValuesParser::new(ansi_codecs))
                .default_value(encoding::all::WINDOWS_1252.name())
                .help("Codec used for input lines that are not valid UTF-8."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!("-v - info, -vv - debug, -vvv - trace.
                    trace output is only available in debug builds, as it is extremely verbose")),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = SoapLogDump::from_cli_matches(&matches).and_then(|mut app| app.run());

    if let Err(e) = result {
        eprintln!("{:?}", e);
        exit(1);
    }
}
