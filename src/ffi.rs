use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::cache::TranslationCache;
use crate::config::CacheSettings;
use crate::store::{Scope, TranslationType};

/// Scope argument selecting the global table.
pub const TC_SCOPE_GLOBAL: i32 = -1;

static LAST_ERROR: Lazy<Mutex<Option<CString>>> = Lazy::new(|| Mutex::new(None));

fn set_last_error(msg: &str) {
    let c = CString::new(msg).unwrap_or_else(|_| CString::new("error").expect("cstr"));
    let mut guard = LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(c);
}

fn take_cstr(ptr: *const c_char, name: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(format!("{name} is null"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(|s| s.to_string())
        .map_err(|_| format!("{name} is not valid UTF-8"))
}

fn scope_arg(scope: i32) -> Scope {
    if scope == TC_SCOPE_GLOBAL {
        Scope::Global
    } else {
        Scope::Level(scope)
    }
}

fn cache_mut<'a>(cache: *mut TranslationCache) -> Result<&'a mut TranslationCache, String> {
    unsafe { cache.as_mut() }.ok_or_else(|| "cache is null".to_string())
}

/// Opens a cache configured from `config_path` (or the default config search when null)
/// and loads the translation directory.
///
/// Returns null on failure (see `tc_last_error_utf8()`). Release with `tc_cache_free`.
#[no_mangle]
pub extern "C" fn tc_cache_open(config_path: *const c_char) -> *mut TranslationCache {
    let explicit = if config_path.is_null() {
        None
    } else {
        match take_cstr(config_path, "config_path") {
            Ok(v) => Some(PathBuf::from(v)),
            Err(e) => {
                set_last_error(&e);
                return std::ptr::null_mut();
            }
        }
    };

    let settings = match CacheSettings::resolve(explicit) {
        Ok(v) => v,
        Err(err) => {
            set_last_error(&format!("{err:#}"));
            return std::ptr::null_mut();
        }
    };
    let mut cache = TranslationCache::new(settings);
    cache.load_translations();
    Box::into_raw(Box::new(cache))
}

/// Looks `text` up after substitutions. Returns an owned string (free with
/// `tc_string_free`) or null when no translation is known.
#[no_mangle]
pub extern "C" fn tc_cache_lookup(
    cache: *mut TranslationCache,
    text: *const c_char,
    scope: i32,
) -> *mut c_char {
    let result = cache_mut(cache).and_then(|cache| {
        let text = take_cstr(text, "text")?;
        let text = cache.substitute(&text);
        Ok(cache.translate(&text, scope_arg(scope)))
    });
    match result {
        Ok(Some(value)) => match CString::new(value) {
            Ok(c) => c.into_raw(),
            Err(_) => {
                set_last_error("translation contains a NUL byte");
                std::ptr::null_mut()
            }
        },
        Ok(None) => std::ptr::null_mut(),
        Err(e) => {
            set_last_error(&e);
            std::ptr::null_mut()
        }
    }
}

/// Records a translation and queues it for the output log (global scope only).
///
/// Returns 0 on success; non-zero on failure.
#[no_mangle]
pub extern "C" fn tc_cache_add(
    cache: *mut TranslationCache,
    original: *const c_char,
    translation: *const c_char,
    scope: i32,
) -> i32 {
    let cache = match cache_mut(cache) {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 1;
        }
    };
    let original = match take_cstr(original, "original") {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };
    let translation = match take_cstr(translation, "translation") {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 3;
        }
    };
    cache.add_translation_to_cache(
        &original,
        &translation,
        true,
        TranslationType::Full,
        scope_arg(scope),
    );
    0
}

/// Appends queued translations to the output log. Returns the number written, or -1 on
/// failure (see `tc_last_error_utf8()`).
#[no_mangle]
pub extern "C" fn tc_cache_flush(cache: *mut TranslationCache) -> i64 {
    let cache = match cache_mut(cache) {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return -1;
        }
    };
    match cache.flush() {
        Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
        Err(err) => {
            set_last_error(&format!("{err:#}"));
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn tc_cache_free(cache: *mut TranslationCache) {
    if !cache.is_null() {
        drop(unsafe { Box::from_raw(cache) });
    }
}

#[no_mangle]
pub extern "C" fn tc_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Returns the last error message as a UTF-8 C string pointer (or null if none).
/// The pointer is valid until the next failing call.
#[no_mangle]
pub extern "C" fn tc_last_error_utf8() -> *const c_char {
    let guard = LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner());
    match guard.as_ref() {
        Some(s) => s.as_ptr(),
        None => std::ptr::null(),
    }
}
