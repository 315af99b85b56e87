use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum PageType {
    Article,
    Redirect(String),
    Special,
}

/// One `<page>` element from the dump. The text is the raw wiki markup
/// of the latest revision.
#[derive(Debug, Clone)]
pub struct WikiPage {
    pub id: u32,
    pub title: String,
    pub page_type: PageType,
    pub text: String,
}

/// A retained internal link. `offset` is the zero-based character
/// position of `surface_form` within the cleaned article text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub offset: usize,
    pub uri: String,
    pub surface_form: String,
}

/// The wire record: one JSON object per article, keys in this order.
#[derive(Debug, Serialize)]
pub struct ArticleRecord {
    pub id: u32,
    pub url: String,
    pub title: String,
    pub text: String,
    pub annotations: Vec<Annotation>,
}

/// Builds the article URL: prefix + title with spaces replaced by
/// underscores, first character uppercased (wiki URL convention).
pub fn article_url(title: &str, prefix: &str) -> String {
    let underscored = title.replace(' ', "_");
    let mut chars = underscored.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_replaces_spaces() {
        assert_eq!(
            article_url("Political philosophy", "http://en.wikipedia.org/wiki/"),
            "http://en.wikipedia.org/wiki/Political_philosophy"
        );
    }

    #[test]
    fn url_uppercases_first_char() {
        assert_eq!(
            article_url("anarchism", "http://en.wikipedia.org/wiki/"),
            "http://en.wikipedia.org/wiki/Anarchism"
        );
    }

    #[test]
    fn url_empty_title() {
        assert_eq!(article_url("", "p/"), "p/");
    }

    #[test]
    fn url_non_ascii_first_char() {
        assert_eq!(article_url("étude", "p/"), "p/Étude");
    }

    #[test]
    fn record_serializes_exact_keys() {
        let record = ArticleRecord {
            id: 12,
            url: "http://en.wikipedia.org/wiki/Anarchism".to_string(),
            title: "Anarchism".to_string(),
            text: "Anarchism.".to_string(),
            annotations: vec![Annotation {
                offset: 0,
                uri: "Anarchism".to_string(),
                surface_form: "Anarchism".to_string(),
            }],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"id":12,"url":"http://en.wikipedia.org/wiki/Anarchism","title":"Anarchism","text":"Anarchism.","annotations":[{"offset":0,"uri":"Anarchism","surface_form":"Anarchism"}]}"#
        );
    }
}
