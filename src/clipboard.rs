use log::debug;

use crate::types::{ClipboardSnapshot, RawImage};

/// Outcome of one best-effort clipboard read.
///
/// `Unavailable` covers every failure to open or read the clipboard (usually
/// another process holding it). Callers currently treat it like `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardRead<T> {
    Content(T),
    Absent,
    Unavailable(String),
}

/// Independent image and text reads. Each call acquires and releases the
/// clipboard on its own.
pub trait ClipboardSource {
    fn read_image(&mut self) -> ClipboardRead<RawImage>;
    fn read_text(&mut self) -> ClipboardRead<String>;
}

/// Takes one snapshot. Text is only read when there is no image.
pub fn snapshot<S: ClipboardSource + ?Sized>(source: &mut S) -> ClipboardSnapshot {
    match source.read_image() {
        ClipboardRead::Content(image) => return ClipboardSnapshot::Image(image),
        ClipboardRead::Absent => {}
        ClipboardRead::Unavailable(reason) => debug!("Clipboard image read failed: {}", reason),
    }

    match source.read_text() {
        ClipboardRead::Content(text) => ClipboardSnapshot::Text(text),
        ClipboardRead::Absent => ClipboardSnapshot::Empty,
        ClipboardRead::Unavailable(reason) => {
            debug!("Clipboard text read failed: {}", reason);
            ClipboardSnapshot::Empty
        }
    }
}

#[cfg(target_os = "windows")]
pub use win32::Win32Clipboard as SystemClipboard;

#[cfg(not(target_os = "windows"))]
pub use native::ArboardClipboard as SystemClipboard;

#[cfg(target_os = "windows")]
mod win32 {
    use log::debug;
    use windows::Win32::Foundation::{HANDLE, HGLOBAL};
    use windows::Win32::System::DataExchange::{
        CloseClipboard, GetClipboardData, IsClipboardFormatAvailable, OpenClipboard,
    };
    use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};

    use super::{ClipboardRead, ClipboardSource};
    use crate::types::RawImage;
    use crate::win_formats::{decode_dib, decode_unicode_text};

    const CF_DIB: u32 = 8;
    const CF_UNICODETEXT: u32 = 13;

    /// Open clipboard; closed again on drop, whatever path we leave by.
    struct ClipboardGuard;

    impl ClipboardGuard {
        fn open() -> Result<Self, String> {
            unsafe { OpenClipboard(None) }.map_err(|e| format!("OpenClipboard failed: {}", e))?;
            Ok(Self)
        }
    }

    impl Drop for ClipboardGuard {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseClipboard();
            }
        }
    }

    /// Locked view of a clipboard HGLOBAL.
    struct GlobalView {
        handle: HGLOBAL,
        ptr: *const u8,
        len: usize,
    }

    impl GlobalView {
        /// # Safety
        /// `handle` must come from `GetClipboardData` while the clipboard is open.
        unsafe fn lock(handle: HANDLE) -> Option<Self> {
            let handle = HGLOBAL(handle.0);
            let ptr = unsafe { GlobalLock(handle) } as *const u8;
            if ptr.is_null() {
                return None;
            }
            let len = unsafe { GlobalSize(handle) };
            Some(Self { handle, ptr, len })
        }

        fn bytes(&self) -> &[u8] {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    impl Drop for GlobalView {
        fn drop(&mut self) {
            unsafe {
                let _ = GlobalUnlock(self.handle);
            }
        }
    }

    fn read_format<T>(format: u32, decode: impl FnOnce(&[u8]) -> Result<T, String>) -> ClipboardRead<T> {
        let _guard = match ClipboardGuard::open() {
            Ok(guard) => guard,
            Err(reason) => return ClipboardRead::Unavailable(reason),
        };

        if unsafe { IsClipboardFormatAvailable(format) }.is_err() {
            return ClipboardRead::Absent;
        }

        let handle = match unsafe { GetClipboardData(format) } {
            Ok(handle) => handle,
            Err(e) => {
                return ClipboardRead::Unavailable(format!("GetClipboardData({}) failed: {}", format, e))
            }
        };

        let Some(view) = (unsafe { GlobalView::lock(handle) }) else {
            return ClipboardRead::Unavailable(format!("GlobalLock failed for format {}", format));
        };

        debug!("Clipboard format {} holds {} bytes", format, view.bytes().len());
        match decode(view.bytes()) {
            Ok(value) => ClipboardRead::Content(value),
            Err(reason) => ClipboardRead::Unavailable(reason),
        }
    }

    #[derive(Debug, Default)]
    pub struct Win32Clipboard;

    impl Win32Clipboard {
        pub fn new() -> Self {
            Self
        }
    }

    impl ClipboardSource for Win32Clipboard {
        fn read_image(&mut self) -> ClipboardRead<RawImage> {
            read_format(CF_DIB, |bytes| decode_dib(bytes).map_err(|e| e.to_string()))
        }

        fn read_text(&mut self) -> ClipboardRead<String> {
            read_format(CF_UNICODETEXT, |bytes| Ok(decode_unicode_text(bytes)))
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod native {
    use arboard::{Clipboard, Error as ArboardError};

    use super::{ClipboardRead, ClipboardSource};
    use crate::types::RawImage;

    /// `arboard` backend. A fresh handle per read, dropped before returning.
    #[derive(Debug, Default)]
    pub struct ArboardClipboard;

    impl ArboardClipboard {
        pub fn new() -> Self {
            Self
        }
    }

    fn classify_error<T>(error: ArboardError) -> ClipboardRead<T> {
        match error {
            ArboardError::ContentNotAvailable => ClipboardRead::Absent,
            other => ClipboardRead::Unavailable(other.to_string()),
        }
    }

    impl ClipboardSource for ArboardClipboard {
        fn read_image(&mut self) -> ClipboardRead<RawImage> {
            let mut clipboard = match Clipboard::new() {
                Ok(clipboard) => clipboard,
                Err(e) => return ClipboardRead::Unavailable(e.to_string()),
            };

            match clipboard.get_image() {
                Ok(data) => ClipboardRead::Content(RawImage {
                    width: data.width as u32,
                    height: data.height as u32,
                    rgba: data.bytes.into_owned(),
                }),
                Err(e) => classify_error(e),
            }
        }

        fn read_text(&mut self) -> ClipboardRead<String> {
            let mut clipboard = match Clipboard::new() {
                Ok(clipboard) => clipboard,
                Err(e) => return ClipboardRead::Unavailable(e.to_string()),
            };

            match clipboard.get_text() {
                Ok(text) => ClipboardRead::Content(text),
                Err(e) => classify_error(e),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeClipboard;
    use super::*;

    fn pixel() -> RawImage {
        RawImage {
            width: 1,
            height: 1,
            rgba: vec![1, 2, 3, 255],
        }
    }

    #[test]
    fn image_wins_and_text_is_not_read() {
        let mut source = FakeClipboard::default();
        source.push(
            ClipboardRead::Content(pixel()),
            ClipboardRead::Content("also text".into()),
        );

        assert_eq!(snapshot(&mut source), ClipboardSnapshot::Image(pixel()));
        assert_eq!(source.text_reads, 0);
    }

    #[test]
    fn text_is_read_when_no_image() {
        let mut source = FakeClipboard::default();
        source.push(ClipboardRead::Absent, ClipboardRead::Content("hello".into()));

        assert_eq!(snapshot(&mut source), ClipboardSnapshot::Text("hello".into()));
        assert_eq!(source.text_reads, 1);
    }

    #[test]
    fn unavailable_collapses_to_empty() {
        let mut source = FakeClipboard::default();
        source.push(
            ClipboardRead::Unavailable("busy".into()),
            ClipboardRead::Unavailable("busy".into()),
        );

        assert_eq!(snapshot(&mut source), ClipboardSnapshot::Empty);
    }
}
