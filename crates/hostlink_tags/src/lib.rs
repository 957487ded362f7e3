//! # Hostlink Tags
//!
//! Renders the analytics tag manager snippet for a configured container id.
//!
//! With no id configured nothing is rendered; the page works without
//! analytics. With an id, [`TagManager::render`] returns the loader script
//! for the document head and the `<noscript>` iframe fallback for the top of
//! the body.
//!
//! ## Example
//!
//! ```
//! use hostlink_tags::{TagManager, TagManagerConfig};
//!
//! let manager = TagManager::new(TagManagerConfig::with_tag_id("GTM-ABC123")).unwrap();
//! let snippet = manager.render().unwrap();
//! assert!(snippet.body_noscript.contains("ns.html?id=GTM-ABC123"));
//!
//! let disabled = TagManager::new(TagManagerConfig::default()).unwrap();
//! assert!(disabled.render().is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable holding the container id.
pub const ENV_TAG_ID: &str = "HOSTLINK_TAG_ID";

/// Origin serving the loader and the fallback frame.
pub const TAG_ORIGIN: &str = "https://www.googletagmanager.com";

/// Errors building a [`TagManager`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The id contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid tag id: {0:?}")]
    InvalidTagId(String),
}

/// Tag manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagManagerConfig {
    /// Container id. `None` disables the tag manager.
    pub tag_id: Option<String>,
}

impl TagManagerConfig {
    /// Creates a configuration for `tag_id`.
    pub fn with_tag_id(tag_id: impl Into<String>) -> Self {
        Self {
            tag_id: Some(tag_id.into()),
        }
    }

    /// Reads the id from [`ENV_TAG_ID`].
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the id through `lookup`, treating a blank value as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let tag_id = lookup(ENV_TAG_ID)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Self { tag_id }
    }

    /// Prefers `explicit` over this configuration's id.
    #[must_use]
    pub fn overridden_by(self, explicit: Option<String>) -> Self {
        match explicit {
            Some(id) if !id.trim().is_empty() => Self {
                tag_id: Some(id.trim().to_string()),
            },
            _ => self,
        }
    }
}

/// Markup to embed in a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSnippet {
    /// `<script>` element for the document head.
    pub head_script: String,
    /// `<noscript>` element for the start of the body.
    pub body_noscript: String,
}

impl fmt::Display for TagSnippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.head_script)?;
        write!(f, "{}", self.body_noscript)
    }
}

/// Renders the tag manager snippet.
#[derive(Debug)]
pub struct TagManager {
    tag_id: Option<String>,
    warned: AtomicBool,
}

impl TagManager {
    /// Creates a manager, validating the configured id.
    pub fn new(config: TagManagerConfig) -> Result<Self, TagError> {
        if let Some(id) = &config.tag_id {
            if !is_valid_tag_id(id) {
                return Err(TagError::InvalidTagId(id.clone()));
            }
        }
        Ok(Self {
            tag_id: config.tag_id,
            warned: AtomicBool::new(false),
        })
    }

    /// Returns the configured id.
    pub fn tag_id(&self) -> Option<&str> {
        self.tag_id.as_deref()
    }

    /// Returns true if an id is configured.
    pub fn is_enabled(&self) -> bool {
        self.tag_id.is_some()
    }

    /// Returns the snippet, or `None` when no id is configured.
    pub fn render(&self) -> Option<TagSnippet> {
        let Some(id) = self.tag_id.as_deref() else {
            if cfg!(debug_assertions) && !self.warned.swap(true, Ordering::Relaxed) {
                warn!(
                    env = ENV_TAG_ID,
                    "tag manager id not configured, analytics will not be loaded"
                );
            }
            return None;
        };

        debug!(tag_id = id, "rendering tag manager snippet");
        Some(TagSnippet {
            head_script: head_script(id),
            body_noscript: body_noscript(id),
        })
    }
}

/// Returns true if `id` is non-empty and uses only `[A-Za-z0-9_-]`.
pub fn is_valid_tag_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn head_script(id: &str) -> String {
    format!(
        "<script>(function(w,d,s,l,i){{w[l]=w[l]||[];w[l].push({{'gtm.start':\
new Date().getTime(),event:'gtm.js'}});var f=d.getElementsByTagName(s)[0],\
j=d.createElement(s),dl=l!='dataLayer'?'&l='+l:'';j.async=true;j.src=\
'{TAG_ORIGIN}/gtm.js?id='+i+dl;f.parentNode.insertBefore(j,f);\
}})(window,document,'script','dataLayer','{id}');</script>"
    )
}

fn body_noscript(id: &str) -> String {
    format!(
        "<noscript><iframe src=\"{TAG_ORIGIN}/ns.html?id={id}\" height=\"0\" width=\"0\" \
style=\"display:none;visibility:hidden\" aria-hidden=\"true\" \
title=\"Google Tag Manager\"></iframe></noscript>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_id_renders_nothing() {
        let manager = TagManager::new(TagManagerConfig::default()).unwrap();
        assert!(!manager.is_enabled());
        assert!(manager.render().is_none());
        // Second render stays silent and still returns nothing.
        assert!(manager.render().is_none());
    }

    #[test]
    fn snippet_embeds_id() {
        let manager = TagManager::new(TagManagerConfig::with_tag_id("GTM-K9X2")).unwrap();
        let snippet = manager.render().unwrap();

        assert!(snippet.head_script.starts_with("<script>"));
        assert!(snippet.head_script.ends_with("'dataLayer','GTM-K9X2');</script>"));
        assert!(snippet
            .head_script
            .contains("'https://www.googletagmanager.com/gtm.js?id='+i+dl"));
        assert_eq!(
            snippet.body_noscript,
            "<noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id=GTM-K9X2\" \
             height=\"0\" width=\"0\" style=\"display:none;visibility:hidden\" \
             aria-hidden=\"true\" title=\"Google Tag Manager\"></iframe></noscript>"
        );
        assert_eq!(snippet.to_string().lines().count(), 2);
    }

    #[test]
    fn markup_ids_rejected() {
        for id in ["GTM-1\"><script>", "GTM 1", "GTM-1');alert(1)//", ""] {
            assert_eq!(
                TagManager::new(TagManagerConfig::with_tag_id(id)).unwrap_err(),
                TagError::InvalidTagId(id.to_string())
            );
        }
    }

    #[test]
    fn config_from_lookup() {
        let config = TagManagerConfig::from_lookup(|name| {
            (name == ENV_TAG_ID).then(|| " GTM-ENV ".to_string())
        });
        assert_eq!(config.tag_id.as_deref(), Some("GTM-ENV"));

        let blank = TagManagerConfig::from_lookup(|_| Some("   ".to_string()));
        assert_eq!(blank.tag_id, None);
    }

    #[test]
    fn explicit_id_overrides_environment() {
        let env = TagManagerConfig::with_tag_id("GTM-ENV");
        assert_eq!(
            env.clone().overridden_by(Some("GTM-ARG".into())).tag_id.as_deref(),
            Some("GTM-ARG")
        );
        assert_eq!(env.clone().overridden_by(None), env);
        assert_eq!(env.clone().overridden_by(Some(" ".into())), env);
    }

    proptest! {
        #[test]
        fn valid_ids_render(id in "[A-Za-z0-9_-]{1,20}") {
            let manager = TagManager::new(TagManagerConfig::with_tag_id(id.clone())).unwrap();
            let snippet = manager.render().unwrap();
            let expected = format!("ns.html?id={id}\"");
            prop_assert!(snippet.body_noscript.contains(&expected));
        }

        #[test]
        fn ids_with_other_characters_rejected(id in "[A-Za-z0-9]{0,4}[<>\"' &;/()][A-Za-z0-9]{0,4}") {
            prop_assert!(TagManager::new(TagManagerConfig::with_tag_id(id)).is_err());
        }
    }
}
