use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time in the format YYYY-MM-DD HH:MM:SS TZ
#[cfg(unix)]
pub fn now() -> String {
    use std::ffi::CStr;

    let secs = unix_timestamp() as libc::time_t;
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    let mut buf = [0 as libc::c_char; 100];

    unsafe {
        libc::localtime_r(&secs, &mut tm);
        let written = libc::strftime(
            buf.as_mut_ptr(),
            buf.len(),
            b"%Y-%m-%d %H:%M:%S %Z\0".as_ptr() as *const libc::c_char,
            &tm,
        );
        if written == 0 {
            return secs.to_string();
        }
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    }
}

/// Returns the current time in the format YYYY-MM-DD HH:MM:SS
#[cfg(windows)]
pub fn now() -> String {
    use windows_sys::Win32::Foundation::SYSTEMTIME;
    use windows_sys::Win32::System::SystemInformation::GetLocalTime;

    let mut tm: SYSTEMTIME = unsafe { std::mem::zeroed() };
    unsafe {
        GetLocalTime(&mut tm);
    }

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        tm.wYear, tm.wMonth, tm.wDay, tm.wHour, tm.wMinute, tm.wSecond
    )
}

#[cfg(not(any(unix, windows)))]
pub fn now() -> String {
    unix_timestamp().to_string()
}

/// Returns the current Unix timestamp in seconds
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_has_date_prefix() {
        let stamp = now();
        // YYYY-MM-DD
        assert!(stamp.len() >= 10, "unexpected timestamp: {}", stamp);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[7..8], "-");
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // 2020-01-01
        assert!(unix_timestamp() > 1_577_836_800);
    }
}
