//! Path fragments appended to the REST root.
//!
//! Names are not validated; a bad name surfaces as a 400/404 from PostgREST.

/// `/users` for table `users`.
pub fn table_endpoint(table: &str) -> String {
    format!("/{table}")
}

/// `/rpc/get_users` for function `get_users`.
pub fn rpc_endpoint(function: &str) -> String {
    format!("/rpc/{function}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_and_rpc_paths() {
        assert_eq!(table_endpoint("users"), "/users");
        assert_eq!(rpc_endpoint("get_users"), "/rpc/get_users");
    }
}
