mod common;

use common::*;
use rand::Rng;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[test]
fn test_async_string_result() {
    let conn = Connection::open();
    let (_implementation, proxy) = conn.sample();

    let task = proxy.get_string_async();
    conn.wait_messages();

    assert_eq!(task.try_result(), Some(Ok("result".to_string())));
    assert_eq!(conn.client.pending_call_count(), 0);
}

#[test]
fn test_integer_sums_wrap_around() {
    let conn = Connection::open();
    let (_implementation, proxy) = conn.sample();

    let b = proxy.b_sum(255, 1);
    let us = proxy.us_sum(65535, 1);
    let s = proxy.s_sum(100, -150);
    let i = proxy.i_sum(100, -150);
    let ui = proxy.ui_sum(u32::MAX, 0);
    let ui_wrap = proxy.ui_sum(u32::MAX, 2);
    let l = proxy.l_sum(i64::MAX, 0);
    let l_wrap = proxy.l_sum(i64::MAX, 1);
    let ul = proxy.ul_sum(u64::MAX, 0);

    conn.wait_messages();

    assert_eq!(b.try_result(), Some(Ok(0)));
    assert_eq!(us.try_result(), Some(Ok(0)));
    assert_eq!(s.try_result(), Some(Ok(-50)));
    assert_eq!(i.try_result(), Some(Ok(-50)));
    assert_eq!(ui.try_result(), Some(Ok(u32::MAX)));
    assert_eq!(ui_wrap.try_result(), Some(Ok(1)));
    assert_eq!(l.try_result(), Some(Ok(i64::MAX)));
    assert_eq!(l_wrap.try_result(), Some(Ok(i64::MIN)));
    assert_eq!(ul.try_result(), Some(Ok(u64::MAX)));
}

#[test]
fn test_random_sums_match_local_wrapping() {
    let conn = Connection::open();
    let (_implementation, proxy) = conn.sample();
    let mut rng = rand::rng();

    let cases: Vec<(u8, u8, i32, i32, u64, u64)> = (0..50)
        .map(|_| (rng.random(), rng.random(), rng.random(), rng.random(), rng.random(), rng.random()))
        .collect();

    let tasks: Vec<_> = cases
        .iter()
        .map(|&(a, b, c, d, e, f)| (proxy.b_sum(a, b), proxy.i_sum(c, d), proxy.ul_sum(e, f)))
        .collect();

    conn.wait_messages();

    for ((a, b, c, d, e, f), (byte, int, ulong)) in cases.into_iter().zip(tasks) {
        assert_eq!(byte.try_result(), Some(Ok(a.wrapping_add(b))));
        assert_eq!(int.try_result(), Some(Ok(c.wrapping_add(d))));
        assert_eq!(ulong.try_result(), Some(Ok(e.wrapping_add(f))));
    }
}

#[test]
fn test_async_void_does_not_block() {
    let conn = Connection::open();
    let (implementation, proxy) = conn.sample();

    // Stall the server so the call cannot possibly have been answered yet.
    conn.server
        .scheduler()
        .queue(|| std::thread::sleep(Duration::from_millis(100)))
        .unwrap();

    let task = proxy.notify_async();
    assert!(!task.is_completed());

    conn.wait_messages();
    assert_eq!(implementation.notified.load(Ordering::SeqCst), 1);
    assert_eq!(task.try_result(), Some(Ok(())));
}

#[test]
fn test_call_queued_behind_other_work_completes() {
    let conn = Connection::open();
    let (_implementation, proxy) = conn.sample();

    for _ in 0..10 {
        conn.server
            .scheduler()
            .queue(|| std::thread::sleep(Duration::from_millis(5)))
            .unwrap();
    }

    let task = proxy.get_string_async();
    conn.wait_messages();
    assert_eq!(task.try_result(), Some(Ok("result".to_string())));
}

#[tokio::test]
async fn test_async_result_can_be_awaited() {
    let conn = Connection::open();
    let (_implementation, proxy) = conn.sample();

    let (text, sum) = tokio::join!(proxy.get_string_async(), proxy.s_sum(-1, -1));

    assert_eq!(text.unwrap(), "result");
    assert_eq!(sum.unwrap(), -2);
}

#[tokio::test]
async fn test_many_concurrent_calls_resolve_to_their_own_results() {
    let conn = Connection::open();
    let (_implementation, proxy) = conn.sample();

    let tasks: Vec<_> = (0..200u32).map(|n| proxy.ui_sum(n, n)).collect();
    let results = futures::future::join_all(tasks).await;

    for (n, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), (n as u32) * 2);
    }
}
