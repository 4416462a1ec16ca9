use crate::api::models::{AuthCredentials, PreprocessingOptions, ScrapeRequest};

/// The fields a user fills in before submitting a scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeForm {
    pub url: String,
    pub requires_auth: bool,
    pub username: String,
    pub password: String,
    pub preprocessing: PreprocessingOptions,
}

impl ScrapeForm {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.requires_auth = true;
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// `None` when the URL is blank; nothing should be sent in that case.
    pub fn to_request(&self, max_workers: usize) -> Option<ScrapeRequest> {
        let url = self.url.trim();
        if url.is_empty() {
            return None;
        }

        let auth = self.requires_auth.then(|| AuthCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
        });

        Some(ScrapeRequest {
            url: url.to_string(),
            max_workers,
            preprocessing_options: Some(self.preprocessing.clone()),
            auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_builds_no_request() {
        assert!(ScrapeForm::new("   \t").to_request(5).is_none());
        assert!(ScrapeForm::new("").to_request(5).is_none());
    }

    #[test]
    fn url_is_trimmed_and_options_always_sent() {
        let req = ScrapeForm::new("  https://example.com ").to_request(5).unwrap();
        assert_eq!(req.url, "https://example.com");
        assert_eq!(req.max_workers, 5);
        assert_eq!(req.preprocessing_options, Some(PreprocessingOptions::default()));
        assert!(req.auth.is_none());
    }

    #[test]
    fn credentials_only_sent_when_auth_is_required() {
        let mut form = ScrapeForm::new("https://example.com");
        form.username = "left-over".into();
        assert!(form.to_request(5).unwrap().auth.is_none());

        let req = form.with_auth("ada", "s3cret").to_request(5).unwrap();
        assert_eq!(
            req.auth,
            Some(AuthCredentials {
                username: "ada".into(),
                password: "s3cret".into(),
            })
        );
    }
}
