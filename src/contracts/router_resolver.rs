use ethers::prelude::abigen;

abigen!(
    RouterResolver,
    r#"[
        function lookup(bytes4 sig) external view returns (address)
    ]"#
);
