use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Allow/Disallow rules that apply to every user agent (`User-agent: *`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    prefix: String,
}

impl RobotsRules {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn parse(body: &str) -> Self {
        let mut rules = Vec::new();
        let mut group_applies = false;
        let mut in_agent_lines = false;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group_applies = false;
                        in_agent_lines = true;
                    }
                    if value == "*" {
                        group_applies = true;
                    }
                }
                "allow" | "disallow" => {
                    in_agent_lines = false;
                    if group_applies && !value.is_empty() {
                        rules.push(Rule {
                            allow: field == "allow",
                            prefix: value.to_string(),
                        });
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        Self { rules }
    }

    /// Longest matching prefix decides; ties go to `Allow`.
    pub fn allows(&self, url: &Url) -> bool {
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        self.rules
            .iter()
            .filter(|rule| target.starts_with(&rule.prefix))
            .max_by(|a, b| a.prefix.len().cmp(&b.prefix.len()).then(a.allow.cmp(&b.allow)))
            .map_or(true, |rule| rule.allow)
    }
}

/// Fetches `/robots.txt` for the site of `url`. Any failure means "allowed".
pub async fn fetch_rules(client: &Client, url: &Url) -> RobotsRules {
    let mut robots_url = url.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);
    debug!("Checking robots.txt at: {}", robots_url);

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Error checking robots.txt at {}: {}; assuming allowed", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!("No robots.txt at {} ({})", robots_url, response.status());
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsRules::parse(&body),
        Err(e) => {
            warn!("Unreadable robots.txt at {}: {}; assuming allowed", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://example.com").unwrap().join(path).unwrap()
    }

    #[test]
    fn only_the_wildcard_group_counts() {
        let rules = RobotsRules::parse(
            "User-agent: Googlebot\nDisallow: /\n\nUser-agent: *\nDisallow: /private\n",
        );
        assert!(rules.allows(&url("/public")));
        assert!(!rules.allows(&url("/private/notes")));
    }

    #[test]
    fn longer_allow_beats_shorter_disallow() {
        let rules = RobotsRules::parse(
            "User-agent: *\nDisallow: /shop\nAllow: /shop/catalog # public listing\n",
        );
        assert!(!rules.allows(&url("/shop/cart")));
        assert!(rules.allows(&url("/shop/catalog/1")));
    }

    #[test]
    fn empty_disallow_allows_everything() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n");
        assert!(rules.allows(&url("/anything")));
    }

    #[test]
    fn grouped_agents_share_rules() {
        let rules = RobotsRules::parse("User-agent: bot-a\nUser-agent: *\nDisallow: /tmp\n");
        assert!(!rules.allows(&url("/tmp/file")));
    }
}
