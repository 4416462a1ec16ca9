use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::Html;
use std::collections::HashSet;

use crate::api::models::PreprocessingOptions;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "did", "do", "does", "doing", "don", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor",
        "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such", "t",
        "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
        "why", "will", "with", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Turns a fetched HTML document into text according to the request options.
/// Steps run in a fixed order: html, special chars, whitespace, stopwords.
pub fn preprocess(content: &str, options: &PreprocessingOptions) -> String {
    let mut content = if options.clean_html {
        clean_html(content)
    } else {
        content.to_string()
    };

    if options.remove_special_chars {
        content = remove_special_chars(&content);
    }

    if options.remove_extra_whitespace {
        content = remove_extra_whitespace(&content);
    }

    if options.remove_stopwords {
        content = remove_stopwords(&content);
    }

    content
}

/// Text nodes of the document, trimmed and joined by single spaces.
/// Entities are decoded by the parser; script and style bodies are dropped.
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let inside_code = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(el) => matches!(el.name(), "script" | "style" | "noscript"),
            _ => false,
        });
        if inside_code {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

pub fn remove_special_chars(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect()
}

pub fn remove_extra_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn remove_stopwords(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !STOPWORDS.contains(word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}
