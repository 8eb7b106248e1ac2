/// Errors surfaced by the extraction library.
///
/// Row- and cell-level parse failures never show up here: those are absorbed
/// by the aggregators and simply leave a field null or drop a row.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The element stream is not valid JSON or not an element list.
    #[error("malformed element stream: {0}")]
    MalformedInput(#[from] serde_json::Error),

    /// The element stream parsed but has no element list at the top level.
    #[error("malformed element stream: expected an array or an object with `elements`")]
    MissingElements,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The layout service could not be reached.
    #[error("layout service unavailable: {0}")]
    Layout(#[from] reqwest::Error),

    /// The layout service answered with a non-success status.
    #[error("layout service returned HTTP {status}: {body}")]
    LayoutStatus { status: u16, body: String },

    #[error("layout service API key is not configured (set AIP_LAYOUT__API_KEY)")]
    MissingApiKey,

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The two AD 2.12 column groups carry a different number of rows, so a
    /// positional pairing would attach slope/strip data to the wrong runway.
    #[error("AD 2.12 column groups are misaligned: {runways} runway rows vs {fragments} slope/strip rows")]
    FragmentMisalignment { runways: usize, fragments: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
