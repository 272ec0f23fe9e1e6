//! Types representing extracted references and their classification.

use std::fmt;

/// Kind of reference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Direct HTTP/HTTPS URL
    Url,
    /// URL pointing at a PDF document
    PdfLink,
    /// DOI identifier (`10.XXXX/suffix`)
    Doi,
    /// arXiv identifier or arxiv.org URL
    Arxiv,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => write!(f, "URL"),
            Self::PdfLink => write!(f, "PDF"),
            Self::Doi => write!(f, "DOI"),
            Self::Arxiv => write!(f, "arXiv"),
        }
    }
}

/// A single reference found in input.
///
/// Immutable value. Duplicates are tolerated: the same identifier may appear
/// on several pages, and verification happens once per distinct identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// The identifier as extracted (URL, DOI, or arXiv ID)
    pub identifier: String,
    /// Detected reference kind
    pub kind: RefKind,
    /// Page number where the reference was found, when known
    pub page: Option<u32>,
}

impl Reference {
    /// Creates a new reference.
    #[must_use]
    pub fn new(identifier: impl Into<String>, kind: RefKind, page: Option<u32>) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            page,
        }
    }

    /// Creates a reference from a URL, classifying PDF and arXiv links.
    #[must_use]
    pub fn from_url(url: impl Into<String>, page: Option<u32>) -> Self {
        let url = url.into();
        let kind = classify_url(&url);
        Self::new(url, kind, page)
    }

    /// Creates a DOI reference.
    #[must_use]
    pub fn doi(doi: impl Into<String>, page: Option<u32>) -> Self {
        Self::new(doi, RefKind::Doi, page)
    }

    /// Creates an arXiv reference from a bare identifier.
    #[must_use]
    pub fn arxiv(id: impl Into<String>, page: Option<u32>) -> Self {
        Self::new(id, RefKind::Arxiv, page)
    }

    /// Returns the URL to probe for reachability, or `None` for DOI references
    /// (those go through the retraction check instead).
    ///
    /// Bare arXiv identifiers are expanded to their abstract page URL.
    #[must_use]
    pub fn link_target(&self) -> Option<String> {
        match self.kind {
            RefKind::Url | RefKind::PdfLink => Some(self.identifier.clone()),
            RefKind::Arxiv => {
                if self.identifier.starts_with("http://") || self.identifier.starts_with("https://")
                {
                    Some(self.identifier.clone())
                } else {
                    Some(format!("https://arxiv.org/abs/{}", self.identifier))
                }
            }
            RefKind::Doi => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "[{}] {} (page {})", self.kind, self.identifier, page),
            None => write!(f, "[{}] {}", self.kind, self.identifier),
        }
    }
}

/// Classifies a URL as a plain link, a PDF link, or an arXiv link.
fn classify_url(url: &str) -> RefKind {
    if url.contains("arxiv.org/") {
        return RefKind::Arxiv;
    }
    // Ignore query/fragment when looking at the extension
    let path_end = url.find(['?', '#']).unwrap_or(url.len());
    if url[..path_end].to_ascii_lowercase().ends_with(".pdf") {
        RefKind::PdfLink
    } else {
        RefKind::Url
    }
}
