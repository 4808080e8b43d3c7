use std::{
    collections::{hash_map::DefaultHasher, HashSet},
    fmt::Write as _,
    hash::{Hash, Hasher},
};

use super::*;
use crate::memory::SystemArrayResource;
use assert2::{assert, check, let_assert};

type Str = OwnedString;
type Doubling = OwnedString<200>;

fn hash_of(value: &(impl Hash + ?Sized)) -> u64 {
    let mut h = DefaultHasher::new();
    value.hash(&mut h);
    h.finish()
}

#[test]
fn default_allocates_nothing() {
    let mut s = Str::new();
    assert!(!s.is_initialized());
    assert!(s.capacity() == 0);
    assert!(s.as_bytes().is_empty());
    let_assert!(Err(Error::UninitializedMemory("String not initialized")) = s.c_str());
    let_assert!(Err(Error::UninitializedMemory(_)) = s.at(0));
}

#[test]
fn with_capacity_reserves_terminator_slot() {
    let s = Str::with_capacity(10).unwrap();
    assert!(s.capacity() == 11);
    assert!(s.max_capacity() == 10);
    assert!(s.is_empty());
}

#[test]
fn push_grows_geometrically() {
    let mut s = Doubling::with_capacity(3).unwrap();
    s.push_bytes(b"abc").unwrap();
    assert!(s.capacity() == 4);
    s.push(b'd').unwrap();
    // Content room doubles to 8, plus the terminator slot.
    assert!(s.capacity() == 9);
    s.push_bytes(b"efghijklmnop").unwrap();
    assert!(s.len() == 16);
    assert!(s.max_capacity() >= 16);
    assert!(s == "abcdefghijklmnop");
}

#[test]
fn reserve_is_exact() {
    let mut s = Str::from("ab");
    s.reserve(5).unwrap();
    assert!(s.max_capacity() == 7);
    s.reserve(1).unwrap();
    assert!(s.max_capacity() == 7);
}

#[test]
fn c_str_terminates_without_growing() {
    let mut s = Str::from("hello");
    let cap = s.capacity();
    {
        let c = s.c_str().unwrap();
        assert!(c.len() == 6);
        assert!(c[5] == 0);
        assert!(crate::simd::nul_position(c) == Some(5));
    }
    let again = s.c_str().unwrap().to_vec();
    assert!(again == b"hello\0");
    assert!(s.capacity() == cap);
    assert!(s.len() == 5);
}

#[test]
fn c_str_after_filling_to_max() {
    let mut s = Doubling::with_capacity(4).unwrap();
    s.push_bytes(b"abcd").unwrap();
    assert!(s.len() == s.max_capacity());
    assert!(s.c_str().unwrap() == b"abcd\0");
}

#[test]
fn from_nul_terminated_stops_at_nul() {
    let s = Str::from_nul_terminated(b"abc\0def").unwrap();
    assert!(s == "abc");
    let whole = Str::from_nul_terminated(b"no terminator").unwrap();
    assert!(whole.len() == 13);
    let from_ptr = unsafe { Str::from_c_str(b"pointer\0".as_ptr()) }.unwrap();
    assert!(from_ptr == "pointer");
}

#[test]
fn equality_ignores_allocation() {
    let empty_a = Str::new();
    let mut empty_b = Str::from("x");
    empty_b.clear();
    assert!(empty_a == empty_b);
    assert!(empty_b.is_initialized());
    assert!(Str::from("abc") != Str::from("abd"));
    assert!(Str::from("abc") == Doubling::from("abc"));
}

#[test]
fn concatenation_leaves_operands() {
    let s = Str::from("hi");
    let there = Str::from(" there");
    let mut t = &s + &there;
    assert!(t.len() == 8);
    assert!(t.c_str().unwrap() == b"hi there\0");
    assert!(s == "hi");
    assert!(there == " there");
    let u = &t + "!";
    assert!(u == "hi there!");
}

#[test]
fn indexing() {
    let mut s = Str::from("abc");
    s[1] = b'B';
    check!(s[0] == b'a');
    check!(s[1] == b'B');
    let_assert!(Err(Error::OutOfRange("Index out of range")) = s.at(3));
}

#[test]
fn calibrate_after_direct_write() {
    let mut s = Str::with_capacity(8).unwrap();
    let ptr = s.ptr().unwrap();
    unsafe {
        std::ptr::copy_nonoverlapping(b"1234".as_ptr(), ptr.as_ptr(), 4);
        s.calibrate(4);
    }
    assert!(s == "1234");
}

#[test]
fn no_copy_borrows() {
    let buf = *b"borrowed";
    let mut v = Str::no_copy(&buf);
    check!(v.len() == 8);
    check!(v.capacity() == 8);
    check!(v.max_capacity() == 7);
    v.set_len(3).unwrap();
    check!(v == "bor");
    let_assert!(Err(Error::Exception(_)) = v.set_len(4));
    check!(buf == *b"borrowed");
}

#[test]
fn hashes_agree_with_views_and_slices() {
    let s = Str::from("key");
    assert!(hash_of(&s) == hash_of(&s.view()));
    assert!(hash_of(&s) == hash_of(&b"key"[..]));

    let mut set: HashSet<Str> = HashSet::new();
    set.insert(Str::from("alpha"));
    assert!(set.contains(&b"alpha"[..]));
    assert!(!set.contains(&b"beta"[..]));
}

#[test]
fn clone_is_deep() {
    let a = Str::from("abc");
    let mut b = a.clone();
    b.push(b'd').unwrap();
    assert!(a == "abc");
    assert!(b == "abcd");
    assert!(Str::new().clone() == Str::new());
}

#[test]
fn fmt_write_and_display() {
    let mut s = Str::new();
    write!(s, "{}-{}", 12, "ab").unwrap();
    assert!(s.to_string() == "12-ab");
    assert!(format!("{s:?}") == "\"12-ab\"");
    assert!(s.starts_with("12"));
}

#[test]
fn custom_resource_type() {
    let s: OwnedString<150, SystemArrayResource<u8>> =
        OwnedString::from_bytes_in(b"resourceful", SystemArrayResource::new()).unwrap();
    assert!(s.to_str().unwrap() == "resourceful");
}
