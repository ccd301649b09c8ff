//! Links and breadcrumbs for index instances.

use crate::config::PresentationConfig;
use crate::error::Result;
use crate::models::IndexInstance;
use crate::store::IndexStore;

/// Renders instances as plain text or HTML anchors.
pub struct Presenter<'a> {
    store: &'a dyn IndexStore,
    config: &'a PresentationConfig,
}

impl<'a> Presenter<'a> {
    pub fn new(store: &'a dyn IndexStore, config: &'a PresentationConfig) -> Self {
        Self { store, config }
    }

    /// URL of an instance page, or of the instance list for the root.
    pub fn instance_url(&self, instance: Option<&IndexInstance>) -> String {
        let prefix = self.config.url_prefix.trim_end_matches('/');
        match instance {
            Some(instance) => format!("{}/instances/{}/", prefix, instance.id),
            None => format!("{}/instances/", prefix),
        }
    }

    /// Render one instance, or the root for `None`.
    ///
    /// `text` replaces the instance value when it is non-empty; the root
    /// always shows the configured root label. Simple output is the bare
    /// text, otherwise an anchor with escaped text.
    pub fn render_link(
        &self,
        instance: Option<&IndexInstance>,
        text: Option<&str>,
        simple: bool,
    ) -> String {
        let value = match instance {
            Some(instance) => text
                .filter(|t| !t.is_empty())
                .unwrap_or(instance.value.as_str()),
            None => self.config.root_label.as_str(),
        };

        if simple {
            value.to_string()
        } else {
            format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&self.instance_url(instance)),
                escape_html(value)
            )
        }
    }

    /// Render the path from the root to `instance`.
    ///
    /// With `single_link` the parts are rendered as plain text and the whole
    /// breadcrumb becomes one link to `instance`.
    pub fn render_breadcrumb(
        &self,
        instance: &IndexInstance,
        simple: bool,
        single_link: bool,
    ) -> Result<String> {
        let simple = simple || single_link;

        let mut parts = vec![self.render_link(None, None, simple)];
        for ancestor in self.store.ancestors(instance.id)? {
            parts.push(self.render_link(Some(&ancestor), None, simple));
        }
        parts.push(self.render_link(Some(instance), None, simple));

        let joined = parts.join(&self.config.separator);
        if single_link {
            Ok(self.render_link(Some(instance), Some(&joined), false))
        } else {
            Ok(joined)
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
