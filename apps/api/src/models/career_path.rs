use serde::{Deserialize, Serialize};

/// Career path as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerPathInput {
    /// Generated from the path's position when blank.
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A career path fixed for the duration of one search session.
///
/// `requested_count` is the path's initial share of the session quota.
#[derive(Debug, Clone, Serialize)]
pub struct CareerPath {
    pub id: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub requested_count: usize,
}

impl CareerPath {
    pub fn from_input(input: &CareerPathInput, requested_count: usize) -> Self {
        Self {
            id: input.id.trim().to_string(),
            title: input.title.trim().to_string(),
            keywords: input
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            requested_count,
        }
    }

    /// Keywords joined in their given order, or the title when there are none.
    pub fn keyword_query(&self) -> String {
        if self.keywords.is_empty() {
            self.title.clone()
        } else {
            self.keywords.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_trims_and_drops_blank_keywords() {
        let input = CareerPathInput {
            id: " p1 ".to_string(),
            title: " Backend Engineer ".to_string(),
            keywords: vec!["Rust".to_string(), "  ".to_string(), " Postgres".to_string()],
        };
        let path = CareerPath::from_input(&input, 25);
        assert_eq!(path.id, "p1");
        assert_eq!(path.title, "Backend Engineer");
        assert_eq!(path.keywords, vec!["Rust", "Postgres"]);
        assert_eq!(path.requested_count, 25);
    }

    #[test]
    fn test_keyword_query_preserves_order() {
        let input = CareerPathInput {
            id: "p1".to_string(),
            title: "ML Engineer".to_string(),
            keywords: vec!["Python".to_string(), "PyTorch".to_string()],
        };
        assert_eq!(CareerPath::from_input(&input, 1).keyword_query(), "Python PyTorch");
    }

    #[test]
    fn test_keyword_query_falls_back_to_title() {
        let input = CareerPathInput {
            id: "p1".to_string(),
            title: "Product Manager".to_string(),
            keywords: vec![],
        };
        assert_eq!(CareerPath::from_input(&input, 1).keyword_query(), "Product Manager");
    }
}
