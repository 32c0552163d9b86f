//! System clipboard access.

use anyhow::{anyhow, Result};

/// Something that can receive copied text.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard, opened lazily on first write.
///
/// Holding the handle keeps the selection alive on X11, where clipboard
/// contents vanish once the owning process drops its handle.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new()
                .map_err(|e| anyhow!("Could not open system clipboard: {}", e))?;
            self.inner = Some(clipboard);
        }
        match self.inner.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text.to_string())
                .map_err(|e| anyhow!("Clipboard write failed: {}", e)),
            None => Err(anyhow!("Clipboard unavailable")),
        }
    }
}
