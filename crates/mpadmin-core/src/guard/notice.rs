use super::navigation::{Navigation, FALLBACK_PATH};

/// Shown when the redirect carried no message of its own.
pub const DEFAULT_NOTICE: &str = "You do not have permission to access the requested page.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    pub message: String,
}

/// Holds the unauthorized notice for the fallback page until it is shown.
#[derive(Debug, Default)]
pub struct NoticeSlot {
    pending: Option<FallbackNotice>,
}

impl NoticeSlot {
    /// Inspect the href the fallback page was opened with. Returns the clean
    /// path to replace the URL with when it carried a notice, so a reload
    /// does not show it again.
    pub fn offer(&mut self, href: &str) -> Option<&'static str> {
        match Navigation::from_href(href) {
            Navigation::Fallback { message } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_NOTICE.to_string());
                self.pending = Some(FallbackNotice { message });
                Some(FALLBACK_PATH)
            }
            _ => None,
        }
    }

    /// The pending notice, at most once.
    pub fn take(&mut self) -> Option<FallbackNotice> {
        self.pending.take()
    }
}
