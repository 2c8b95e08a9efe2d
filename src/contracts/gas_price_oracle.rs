use ethers::prelude::abigen;

abigen!(
    GasPriceOracle,
    r#"[
        function getL1Fee(bytes data) external view returns (uint256)
    ]"#
);
