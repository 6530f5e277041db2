mod common;

use common::*;
use tandem_rpc_endpoint::{RpcError, RpcList};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_unlinked_list_behaves_like_local_vec() {
    let list = RpcList::<u32>::new();
    assert!(!list.is_linked());

    list.push(1).unwrap();
    list.push(3).unwrap();
    list.insert(1, 2).unwrap();
    assert_eq!(list.to_vec(), vec![1, 2, 3]);

    assert_eq!(list.set(0, 10), Ok(1));
    assert_eq!(list.remove(2), Ok(3));
    assert_eq!(list.get(1), Some(2));
    assert_eq!(list.get(5), None);

    assert_eq!(
        list.insert(9, 0),
        Err(RpcError::IndexOutOfRange { index: 9, len: 2 })
    );
    assert_eq!(
        list.remove(2),
        Err(RpcError::IndexOutOfRange { index: 2, len: 2 })
    );

    list.clear().unwrap();
    assert!(list.is_empty());
}

#[test]
fn test_clones_share_one_copy() {
    let list = RpcList::<String>::new();
    let other = list.clone();
    other.push("shared".to_string()).unwrap();
    assert_eq!(list.len(), 1);
}

#[test]
fn test_server_mutations_reach_client_mirror() {
    let conn = Connection::open();
    let (implementation, proxy) = conn.sample();
    let history = &implementation.history;

    assert!(history.is_linked());
    assert!(proxy.history().is_linked());

    history.push("a".to_string()).unwrap();
    history.push("c".to_string()).unwrap();
    history.insert(1, "b".to_string()).unwrap();
    conn.wait_messages();
    assert_eq!(proxy.history().to_vec(), strings(&["a", "b", "c"]));

    assert_eq!(history.set(2, "z".to_string()), Ok("c".to_string()));
    assert_eq!(history.remove(0), Ok("a".to_string()));
    conn.wait_messages();
    assert_eq!(proxy.history().to_vec(), strings(&["b", "z"]));

    history.clear().unwrap();
    conn.wait_messages();
    assert!(proxy.history().is_empty());
}

#[test]
fn test_client_mutations_reach_server() {
    let conn = Connection::open();
    let (implementation, proxy) = conn.sample();

    proxy.history().push("from client".to_string()).unwrap();
    // Applied locally before anything is sent.
    assert_eq!(proxy.history().len(), 1);

    conn.wait_messages();
    assert_eq!(
        implementation.history.to_vec(),
        strings(&["from client"])
    );
}

#[test]
fn test_mutations_apply_in_arrival_order() {
    let conn = Connection::open();
    let (implementation, proxy) = conn.sample();

    for n in 0..50 {
        implementation.history.push(n.to_string()).unwrap();
    }
    for _ in 0..10 {
        implementation.history.remove(0).unwrap();
    }
    conn.wait_messages();

    let expected: Vec<String> = (10..50).map(|n: i32| n.to_string()).collect();
    assert_eq!(implementation.history.to_vec(), expected);
    assert_eq!(proxy.history().to_vec(), expected);
}

#[test]
fn test_unlinked_mirror_stops_receiving() {
    let conn = Connection::open();
    let (implementation, _proxy) = conn.sample();

    let proxy_scope = conn.client_scope.lifetime().create_nested("short proxy");
    let short = conn
        .client
        .activate_proxy::<SampleService>(&proxy_scope.lifetime())
        .unwrap();

    // The newer proxy replaced the first mirror's link.
    implementation.history.push("one".to_string()).unwrap();
    conn.wait_messages();
    assert_eq!(short.history().to_vec(), strings(&["one"]));

    proxy_scope.terminate();
    assert!(!short.history().is_linked());

    implementation.history.push("two".to_string()).unwrap();
    conn.wait_messages();
    assert_eq!(short.history().to_vec(), strings(&["one"]));

    // Local edits keep working after the link is gone.
    short.history().push("local".to_string()).unwrap();
    conn.wait_messages();
    assert_eq!(implementation.history.to_vec(), strings(&["one", "two"]));
}
