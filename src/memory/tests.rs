use std::{alloc::Layout, ptr::NonNull, sync::Arc, thread};

use super::*;
use crate::{
    test_utils::{drop_counts, Tracked},
    Error,
};
use assert2::{assert, check, let_assert};

#[test]
fn system_resource_round_trip() {
    drop_counts::reset_counts();
    let r = SystemResource;
    let p = r.allocate(Tracked::new(7)).unwrap();
    // SAFETY: `p` is live.
    assert!(unsafe { p.as_ref() }.0 == 7);
    unsafe { Resource::deallocate(&r, p) };
    assert!(drop_counts::total_drop_count() == 1);
}

#[test]
fn system_resource_zero_sized() {
    let r = SystemResource;
    let p = r.allocate(()).unwrap();
    unsafe { Resource::deallocate(&r, p) };
    let raw = Resource::<u8>::raw(&r, Layout::new::<()>()).unwrap();
    unsafe { Resource::<u8>::deallocate_raw(&r, raw, Layout::new::<()>()) };
}

#[test]
fn scalar_reallocate_keeps_prefix_and_drops_tail() {
    drop_counts::reset_counts();
    let r = SystemResource;
    let arr: NonNull<Tracked> = Resource::arr(&r, 4).unwrap();
    for i in 0..4 {
        unsafe { arr.as_ptr().add(i).write(Tracked::new(i as i32)) };
    }
    let arr = unsafe { Resource::reallocate(&r, arr, 4, 2) }.unwrap();
    assert!(drop_counts::total_drop_count() == 2);
    let kept = unsafe { std::slice::from_raw_parts(arr.as_ptr(), 2) };
    assert!(kept == [Tracked(0), Tracked(1)]);
    drop_counts::reset_counts();
    unsafe {
        std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(arr.as_ptr(), 2));
        system::array_free(arr, 2);
    }
    assert!(drop_counts::total_drop_count() == 2);
}

#[test]
fn array_resource_moves_non_trivial_elements() {
    let r = SystemArrayResource::<String>::new();
    let p = r.allocate(2).unwrap();
    unsafe {
        p.as_ptr().write("left".to_owned());
        p.as_ptr().add(1).write("right".to_owned());
    }
    let p = unsafe { r.reallocate(p, 2, 16) }.unwrap();
    let grown = unsafe { std::slice::from_raw_parts(p.as_ptr(), 2) };
    assert!(grown == ["left", "right"]);
    unsafe {
        std::ptr::drop_in_place(std::ptr::slice_from_raw_parts_mut(p.as_ptr(), 2));
        r.deallocate(p, 16);
    }
}

#[test]
fn array_resource_trivial_realloc_path() {
    assert!(is_trivial::<u32>());
    assert!(!is_trivial::<String>());
    let r = SystemArrayResource::<u32>::new();
    let p = r.allocate(3).unwrap();
    unsafe {
        for i in 0..3 {
            p.as_ptr().add(i).write(i as u32 + 10);
        }
    }
    let p = unsafe { r.reallocate(p, 3, 1000) }.unwrap();
    assert!(unsafe { std::slice::from_raw_parts(p.as_ptr(), 3) } == [10, 11, 12]);
    unsafe { r.deallocate(p, 1000) };
}

#[test]
fn array_resource_rejects_overflowing_lengths() {
    let r = SystemArrayResource::<u64>::new();
    let_assert!(Err(Error::FailedAlloc(_)) = r.allocate(usize::MAX));
}

#[test]
fn page_fills_up() {
    let mut page: Page<u8, 3> = Page::new().unwrap();
    let a = page.alloc(1).unwrap();
    page.alloc(2).unwrap();
    let c = page.alloc(3).unwrap();
    assert!(page.is_full());
    let_assert!(Err(Error::FailedAlloc("Out of memory in lazy page allocator")) = page.alloc(4));
    assert!(page.contains(a));
    assert!(page.contains(c));
    assert!(page.slots().count() == 3);
}

#[test]
fn page_drop_flag() {
    drop_counts::reset_counts();
    {
        let mut page: Page<Tracked, 4, true> = Page::new().unwrap();
        page.alloc(Tracked::new(1)).unwrap();
        page.alloc(Tracked::new(2)).unwrap();
    }
    assert!(drop_counts::total_drop_count() == 2);

    drop_counts::reset_counts();
    {
        let mut page: Page<Tracked, 4, false> = Page::new().unwrap();
        let p = page.alloc(Tracked::new(1)).unwrap();
        unsafe { p.as_ptr().drop_in_place() };
    }
    assert!(drop_counts::total_drop_count() == 1);
}

#[test]
fn lazy_allocator_reuses_free_list() {
    let mut alloc: LazyAllocator<u32, 2> = LazyAllocator::new();
    let a = alloc.alloc(1).unwrap();
    let b = alloc.alloc(2).unwrap();
    assert!(alloc.page_count() == 1);
    let c = alloc.alloc(3).unwrap();
    assert!(alloc.page_count() == 2);

    unsafe { alloc.dealloc(b).unwrap() };
    assert!(alloc.free_count() == 1);
    let d = alloc.alloc(4).unwrap();
    check!(d == b);
    check!(alloc.page_count() == 2);
    check!(alloc.free_count() == 0);
    check!(alloc.live() == 3);
    unsafe {
        check!(*a.as_ref() == 1);
        check!(*c.as_ref() == 3);
        check!(*d.as_ref() == 4);
    }
}

#[test]
fn lazy_allocator_free_list_is_lifo() {
    let mut alloc: LazyAllocator<u32, 8> = LazyAllocator::new();
    let ptrs: Vec<_> = (0..4).map(|i| alloc.alloc(i).unwrap()).collect();
    unsafe {
        alloc.dealloc(ptrs[1]).unwrap();
        alloc.dealloc(ptrs[3]).unwrap();
    }
    assert!(alloc.alloc(10).unwrap() == ptrs[3]);
    assert!(alloc.alloc(11).unwrap() == ptrs[1]);
}

#[test]
fn lazy_allocator_rejects_extra_release() {
    let mut alloc: LazyAllocator<u32, 4> = LazyAllocator::new();
    let a = alloc.alloc(1).unwrap();
    unsafe { alloc.dealloc(a).unwrap() };
    let_assert!(Err(Error::InvalidOperation(_)) = unsafe { alloc.dealloc(a) });
    assert!(alloc.free_count() == 1);
}

#[test]
fn lazy_allocator_drops_each_object_once() {
    drop_counts::reset_counts();
    {
        let mut alloc: LazyAllocator<Tracked, 3> = LazyAllocator::new();
        let ptrs: Vec<_> = (0..7).map(|i| alloc.alloc(Tracked::new(i)).unwrap()).collect();
        unsafe {
            alloc.dealloc(ptrs[0]).unwrap();
            alloc.dealloc(ptrs[4]).unwrap();
        }
        assert!(drop_counts::total_drop_count() == 2);
    }
    assert!(drop_counts::total_new_count() == 7);
    assert!(drop_counts::current_live_allocs() == 0);
}

#[test]
fn lazy_allocator_without_drops_leaks_live_objects() {
    drop_counts::reset_counts();
    {
        let mut alloc: LazyAllocator<Tracked, 3, false> = LazyAllocator::new();
        alloc.alloc(Tracked::new(0)).unwrap();
    }
    assert!(drop_counts::total_drop_count() == 0);
}

#[test]
fn lazy_allocator_trim() {
    let mut alloc: LazyAllocator<u8, 4> = LazyAllocator::new();
    let a = alloc.alloc(0).unwrap();
    assert!(!alloc.trim());
    unsafe { alloc.dealloc(a).unwrap() };
    assert!(alloc.trim());
    assert!(alloc.page_count() == 0);
    assert!(alloc.free_count() == 0);
    alloc.alloc(1).unwrap();
    assert!(alloc.page_count() == 1);
}

#[test]
fn monotonic_handles_share_state() {
    let r: MonotonicResource<String, 4> = MonotonicResource::new();
    let r2 = r.clone();
    assert!(r.same_as(&r2));
    assert!(!r.same_as(&MonotonicResource::default()));

    let p = r.allocate("hello".to_owned()).unwrap();
    assert!(r2.live() == 1);
    unsafe { r2.deallocate(p) };
    assert!(r.live() == 0);
    assert!(r.trim());
}

#[test]
fn concurrent_monotonic_from_many_threads() {
    let r: Arc<ConcurrentMonotonicResource<u64, 16>> = Arc::new(ConcurrentMonotonicResource::new());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let r = Arc::clone(&r);
            thread::spawn(move || {
                for i in 0..100u64 {
                    let p = r.allocate(t * 1000 + i).unwrap();
                    // SAFETY: `p` is live and only this thread touches it.
                    assert!(unsafe { *p.as_ref() } == t * 1000 + i);
                    if i % 2 == 0 {
                        unsafe { r.deallocate(p) };
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(r.live() == 200);
}
