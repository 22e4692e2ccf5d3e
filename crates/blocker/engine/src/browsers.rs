//! Recognized browsers and where they keep their address bar.

/// Browser processes whose UI notifications are inspected.
pub const BROWSER_PACKAGES: [&str; 12] = [
    "com.android.chrome",
    "com.chrome.beta",
    "com.chrome.dev",
    "com.chrome.canary",
    "org.mozilla.firefox",
    "org.mozilla.firefox_beta",
    "com.opera.browser",
    "com.opera.mini.native",
    "com.microsoft.emmx",
    "com.brave.browser",
    "com.duckduckgo.mobile.android",
    "com.samsung.android.app.sbrowser",
];

/// Address-bar element names, qualified with the browser's package.
const ADDRESS_BAR_NAMES: [&str; 7] = [
    "url_bar",
    "url_field",
    "search_box_text",
    "url",
    "address_bar_edit_text",
    "mozac_browser_toolbar_url_view",
    "omnibox_text",
];

/// Chromium ids shared by browsers built on it without renaming the views.
const CHROMIUM_FALLBACK_IDS: [&str; 2] = [
    "com.android.chrome:id/url_bar",
    "com.android.chrome:id/search_box_text",
];

pub fn is_browser(package: &str) -> bool {
    BROWSER_PACKAGES.contains(&package)
}

/// Element ids to try, in priority order, when reading the address of `package`.
pub fn address_bar_ids(package: &str) -> Vec<String> {
    ADDRESS_BAR_NAMES
        .iter()
        .map(|name| format!("{package}:id/{name}"))
        .chain(CHROMIUM_FALLBACK_IDS.iter().map(|id| id.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_browser() {
        assert!(is_browser("com.android.chrome"));
        assert!(is_browser("org.mozilla.firefox"));
        assert!(!is_browser("com.example.game"));
        assert!(!is_browser("com.android.Chrome"));
    }

    #[test]
    fn test_address_bar_ids_order() {
        let ids = address_bar_ids("org.mozilla.firefox");
        assert_eq!(ids.len(), 9);
        assert_eq!(ids[0], "org.mozilla.firefox:id/url_bar");
        assert_eq!(ids[5], "org.mozilla.firefox:id/mozac_browser_toolbar_url_view");
        assert_eq!(ids[8], "com.android.chrome:id/search_box_text");
    }
}
