//! Addresses of shared views: `key[+project[+paid|not-paid]]`.
//!
//! The address is what follows `#` in a share URL. It names a link and,
//! optionally, narrows its entries to one project and one paid status.

use std::fmt;
use uuid::Uuid;

use crate::report::EntryFilter;

const PAID: &str = "paid";
const NOT_PAID: &str = "not-paid";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkView {
    pub key: Option<Uuid>,
    pub project: Option<String>,
    pub paid: Option<bool>,
}

impl LinkView {
    pub fn new(key: Uuid) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }

    /// Parses an address, with or without its leading `#`.
    ///
    /// Never fails: an invalid key leaves `key` unset, an unknown paid token
    /// leaves `paid` unset, and an undecodable project name is kept verbatim.
    pub fn parse(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut parts = fragment.split('+');

        let key = parts.next().and_then(|k| Uuid::parse_str(k).ok());
        let project = parts.next().filter(|p| !p.is_empty()).map(|p| {
            urlencoding::decode(p)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| p.to_string())
        });
        let paid = match parts.next() {
            Some(PAID) => Some(true),
            Some(NOT_PAID) => Some(false),
            _ => None,
        };

        Self { key, project, paid }
    }

    /// Renders the address without the leading `#`.
    ///
    /// A paid filter without a project renders an empty project segment.
    pub fn to_fragment(&self) -> String {
        let mut fragment = self.key.map(|k| k.to_string()).unwrap_or_default();
        if self.project.is_some() || self.paid.is_some() {
            fragment.push('+');
            if let Some(project) = &self.project {
                fragment.push_str(&urlencoding::encode(project));
            }
        }
        if let Some(paid) = self.paid {
            fragment.push('+');
            fragment.push_str(if paid { PAID } else { NOT_PAID });
        }
        fragment
    }

    pub fn filter(&self) -> EntryFilter {
        EntryFilter {
            project: self.project.clone(),
            paid: self.paid,
        }
    }
}

impl fmt::Display for LinkView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fragment())
    }
}

/// `base#fragment` for a view.
pub fn share_url(base: &str, view: &LinkView) -> String {
    let base = base.split('#').next().unwrap_or(base);
    format!("{}#{}", base, view.to_fragment())
}
