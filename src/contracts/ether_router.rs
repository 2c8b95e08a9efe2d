use ethers::prelude::abigen;

abigen!(
    EtherRouter,
    r#"[
        function resolver() external view returns (address)
    ]"#
);
