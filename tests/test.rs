use assert2::{assert, check, let_assert};
use pmr_kit::{
    memory::{LazyAllocator, MonotonicResource},
    ostream::RawDescriptor,
    AlphabeticTrie, ConcurrentPtr, Error, List, ListNode, Ostream, OwnedString, RingBuffer, Serialize,
    SharedPtr, Stack, Stream, Vector, ENDL,
};

#[test]
fn vector_growth_trace() {
    let mut v: Vector<i32, 200, 4> = Vector::new();
    for i in 1..=4 {
        v.push_back(i).unwrap();
    }
    check!(v.capacity() == 4);
    check!(v.len() == 4);

    v.push_back(5).unwrap();
    check!(v.capacity() == 8);
    check!(v.as_slice() == [1, 2, 3, 4, 5]);

    for _ in 0..5 {
        v.pop_back();
    }
    check!(v.len() == 0);
    check!(!v.is_initialized());

    v.push_back(6).unwrap();
    check!(v.capacity() == 4);
    check!(v.as_slice() == [6]);
}

#[test]
fn vector_index_at_len_is_out_of_range() {
    let v: Vector<u8> = [1, 2, 3].into_iter().collect();
    let_assert!(Err(Error::OutOfRange(_)) = v.at(3));
    assert!(v.len() <= v.capacity());
}

#[test]
fn string_concat_and_c_str() {
    let s: OwnedString = OwnedString::from("hi");
    let rest: OwnedString = OwnedString::from(" there");
    let mut t = &s + &rest;
    check!(t.len() == 8);
    check!(t.c_str().unwrap() == b"hi there\0");
    check!(t.c_str().unwrap() == b"hi there\0");
    check!(s == "hi");
}

#[test]
fn shared_ptr_refcount() {
    let p: SharedPtr<i32> = SharedPtr::new(42).unwrap();
    assert!(p.use_count() == 1);
    let q = p.clone();
    assert!(p.use_count() == 2);
    let r = p.clone();
    assert!(p.use_count() == 3);
    drop(q);
    assert!(p.use_count() == 2);
    drop(r);
    assert!(p.use_count() == 1);
    assert!(*p == 42);
}

#[test]
fn concurrent_ptr_crosses_threads() {
    let p: ConcurrentPtr<Vec<u32>> = ConcurrentPtr::new((0..10).collect()).unwrap();
    let sums: Vec<u32> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mine = p.clone();
                s.spawn(move || mine.iter().sum::<u32>())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(sums == [45; 4]);
    assert!(p.use_count() == 1);
}

#[test]
fn lazy_allocator_reuses_released_slots() {
    let mut alloc: LazyAllocator<u64, 2> = LazyAllocator::new();
    let a = alloc.alloc(1).unwrap();
    let b = alloc.alloc(2).unwrap();
    let _c = alloc.alloc(3).unwrap();
    assert!(alloc.page_count() == 2);

    unsafe { alloc.dealloc(b) }.unwrap();
    assert!(alloc.free_count() == 1);
    let d = alloc.alloc(4).unwrap();
    assert!(d == b);
    assert!(alloc.page_count() == 2);
    assert!(alloc.owns(a));
}

#[test]
fn ring_buffer_split_write() {
    let mut ring: RingBuffer<u8, 8> = RingBuffer::new().unwrap();
    ring.write(b"......").unwrap();
    ring.write(b"ABCDE").unwrap();
    let got: Vec<u8> = [6, 7, 0, 1, 2].iter().map(|&i| *ring.get(i).unwrap()).collect();
    assert!(got == b"ABCDE");
    assert!(ring.pos() == 3);
}

#[cfg(unix)]
#[test]
fn ostream_flushes_on_drop() {
    let mut fds = [0; 2];
    assert!(unsafe { libc::pipe(fds.as_mut_ptr()) } == 0);
    {
        let mut out: Ostream<1024, _> = Ostream::with_descriptor(RawDescriptor(fds[1])).unwrap();
        out.write_bytes(b"ten bytes!").unwrap();
    }
    unsafe { libc::close(fds[1]) };

    let mut buf = [0u8; 64];
    let n = unsafe { libc::read(fds[0], buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    unsafe { libc::close(fds[0]) };
    assert!(n == 10);
    assert!(&buf[..10] == b"ten bytes!");
}

#[cfg(unix)]
#[test]
fn ostream_formats_a_report() {
    let mut fds = [0; 2];
    assert!(unsafe { libc::pipe(fds.as_mut_ptr()) } == 0);
    {
        let mut out: Ostream<8, _> = Ostream::with_descriptor(RawDescriptor(fds[1])).unwrap();
        let mut trie: AlphabeticTrie = AlphabeticTrie::new();
        for word in ["alpha", "beta", "alpine"] {
            trie.insert(word).unwrap();
        }
        let _ = &mut out << "words=" << trie.len() << " al*=" << trie.starts_with("al") << ENDL;
        assert!(out.take_error().is_none());
    }
    unsafe { libc::close(fds[1]) };

    let mut buf = [0u8; 64];
    let n = unsafe { libc::read(fds[0], buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    unsafe { libc::close(fds[0]) };
    let expected = format!("words=3 al*=true{ENDL}");
    assert!(&buf[..n as usize] == expected.as_bytes());
}

#[test]
fn containers_share_a_monotonic_resource() {
    let nodes: MonotonicResource<ListNode<OwnedString>, 4> = MonotonicResource::new();
    {
        let mut list = List::new_in(nodes.clone());
        for i in 0..10u32 {
            list.push_back(i.serialize().unwrap()).unwrap();
        }
        assert!(nodes.live() == 10);
        assert!(nodes.page_count() == 3);
        assert!(list.pop_front().unwrap() == "0");
        assert!(nodes.live() == 9);
    }
    assert!(nodes.live() == 0);
    assert!(nodes.trim());
    assert!(nodes.page_count() == 0);
}

#[test]
fn stack_over_vector_feeds_a_stream() {
    let mut stack: Stack<char, Vector<char>> = Stack::new();
    for c in "abc".chars() {
        stack.push(c).unwrap();
    }
    let mut reversed: Vector<char> = Vector::new();
    while let Some(c) = stack.pop() {
        reversed.push_back(c).unwrap();
    }

    let mut stream = Stream::new(reversed);
    let mut out = String::new();
    while let Some(c) = stream.next().into_option() {
        out.push(c);
    }
    assert!(out == "cba");
    assert!(stream.curr().into_option() == Some('a'));
}
