use anyhow::{Ok, Result, bail};

use std::ffi::{CStr, CString, c_char};

/// Convert C-String pointer to Rust String
pub fn to_rust_string(ptr: *const c_char) -> Result<String> {
    if ptr.is_null() {
        bail!("pointer to C-String is null, can't convert to Rust String")
    }

    // SAFETY: the pointer is non-null and points to a null-terminated string
    // owned by the caller for the duration of this call.
    let rust_str = unsafe { CStr::from_ptr(ptr) }.to_str()?;
    Ok(rust_str.to_string())
}

/// Convert Rust str to C-String pointer
pub fn to_cstring(string: &str) -> Result<*mut c_char> {
    let cstring = CString::new(string)?;
    Ok(cstring.into_raw())
}

/// Convert Rust vector of Strings to an array of C-String pointers
pub fn to_cstring_array(arr: &[String]) -> Result<*mut *mut c_char> {
    let mut c_arr: Vec<*mut c_char> = arr
        .iter()
        .map(|s| to_cstring(s))
        .collect::<Result<Vec<_>, _>>()?;

    c_arr.push(std::ptr::null_mut()); // null-terminate the array

    let vec_ptr = c_arr.as_mut_ptr();
    std::mem::forget(c_arr); // prevent Rust runtime from freeing the vector

    Ok(vec_ptr)
}

/// Free a C-String
pub fn free_cstring(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: the pointer was produced by `to_cstring`, i.e. by
    // `CString::into_raw`, and has not been freed yet.
    unsafe { drop(CString::from_raw(ptr)) };
}

/// Free an array of C-Strings
pub fn free_cstring_array(ptr: *mut *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let mut current = ptr;
    // SAFETY: the array was produced by `to_cstring_array`: every entry up to
    // the null terminator is an owned C-String, and the array itself is the
    // leaked backing Vec which is reconstructed here with its original
    // length and capacity.
    unsafe {
        while !(*current).is_null() {
            drop(CString::from_raw(*current));
            current = current.add(1);
        }

        // Free the array itself by reconstructing the Vec
        let len = (current as usize - ptr as usize) / std::mem::size_of::<*mut c_char>();
        let capacity = len + 1; // +1 for the null terminator
        drop(Vec::from_raw_parts(ptr, len, capacity));
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_string_round_trip() {
        let ptr = to_cstring("intel_power_gadget").unwrap();
        assert_eq!(to_rust_string(ptr).unwrap(), "intel_power_gadget");
        free_cstring(ptr);
    }

    #[test]
    fn test_null_pointer_is_rejected() {
        to_rust_string(std::ptr::null()).unwrap_err();
    }

    #[test]
    fn test_interior_null_is_rejected() {
        to_cstring("bad\0string").unwrap_err();
    }

    #[test]
    fn test_array_round_trip() {
        let strings = vec!["name".to_string(), "package_no".to_string()];
        let ptr = to_cstring_array(&strings).unwrap();

        // SAFETY: the array holds two entries plus the null terminator.
        unsafe {
            assert_eq!(to_rust_string(*ptr).unwrap(), "name");
            assert_eq!(to_rust_string(*ptr.add(1)).unwrap(), "package_no");
            assert!((*ptr.add(2)).is_null());
        }

        free_cstring_array(ptr);
    }
}
