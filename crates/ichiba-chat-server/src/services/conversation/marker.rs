/// marker.rs - classify-step response parsing
use tracing::debug;

/// Opening delimiter of the search marker
pub const SEARCH_OPEN: &str = "【SEARCH:";
/// Closing delimiter of the search marker
pub const SEARCH_CLOSE: &str = "】";

/// Outcome of the keyword-decision prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Chit-chat: the model text is the reply, verbatim
    Chat(String),

    /// Product request: run a search with this keyword
    Search(String),
}

/// Parse the classify-step response.
///
/// The response is a search request iff it contains [`SEARCH_OPEN`]. The
/// keyword is the whole response with every opening and closing delimiter
/// removed, then trimmed. Malformed markers are not rejected: any text
/// around the marker, or a missing closing delimiter, ends up in the keyword.
pub fn parse_classification(response: &str) -> Classification {
    if !response.contains(SEARCH_OPEN) {
        return Classification::Chat(response.to_string());
    }

    let keyword = response
        .replace(SEARCH_OPEN, "")
        .replace(SEARCH_CLOSE, "")
        .trim()
        .to_string();

    debug!("Search marker found, keyword={:?}", keyword);
    Classification::Search(keyword)
}
