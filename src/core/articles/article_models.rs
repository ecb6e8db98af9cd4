// Domain models for the article pipeline.
// Nothing here knows about Google, OpenAI or HTTP: rows come in as plain
// strings and documents go out as a name plus text.

/// A raw spreadsheet row, one string per cell, as returned by a `SheetSource`.
pub type SheetRow = Vec<String>;

/// One unit of work read from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub day: String,
    pub topic: String,
    pub audience: String,
}

impl Row {
    /// Builds a row from the first three cells.
    ///
    /// Returns `None` when fewer than three cells are present; extra cells
    /// are ignored.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        match cells {
            [day, topic, audience, ..] => Some(Self {
                day: day.clone(),
                topic: topic.clone(),
                audience: audience.clone(),
            }),
            _ => None,
        }
    }
}

/// Generated article text, plain paragraphs without markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    text: String,
}

impl Article {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Handle to a document created by a `DocumentSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDocument {
    pub id: String,
    /// Viewer/editor link, when the provider returns one.
    pub link: Option<String>,
}

/// Reduces a topic to characters that are safe in a document name.
///
/// Keeps alphanumerics (Unicode-aware), spaces and hyphens, then trims
/// trailing whitespace. Applying it twice gives the same result as once.
pub fn sanitize_topic(topic: &str) -> String {
    let kept: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect();

    kept.trim_end().to_string()
}

/// Composes the document name used when publishing: `"{day} - {topic}"`.
pub fn document_name(day: &str, topic: &str) -> String {
    format!("{} - {}", day, sanitize_topic(topic))
}
