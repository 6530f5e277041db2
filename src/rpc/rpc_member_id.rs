use xxhash_rust::const_xxh3::xxh3_64 as const_xxh3_64;

/// Hashes a contract name or a `"Contract.member"` path to its wire id.
pub const fn member_id_hash(name: &str) -> u64 {
    const_xxh3_64(name.as_bytes())
}

/// Compile-time contract/member id generator using xxHash3.
///
/// Both endpoints derive the same ids from the same names, so no id table
/// has to be exchanged before the first call.
///
/// ```rust
/// let add = tandem::rpc_member_id!("Calculator.add");
/// let mult = tandem::rpc_member_id!("Calculator.mult");
/// assert_ne!(add, mult);
/// ```
#[macro_export]
macro_rules! rpc_member_id {
    ($name:expr) => {{
        const ID: u64 = $crate::rpc::member_id_hash($name);
        ID
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_distinct() {
        const A: u64 = member_id_hash("Demo.a");
        assert_eq!(A, member_id_hash("Demo.a"));
        assert_ne!(A, member_id_hash("Demo.b"));
        assert_eq!(crate::rpc_member_id!("Demo.a"), A);
    }
}
