use alloy::sol;
use serde::{Deserialize, Serialize};

sol! {
    #[derive(Debug, Deserialize, Serialize)]
    event IntentSubmitted(uint256 indexed intentId, address indexed submitter);

    #[derive(Debug, Deserialize, Serialize)]
    event IntentApproved(uint256 indexed intentId, address indexed moderator);

    #[derive(Debug, Deserialize, Serialize)]
    event IntentRejected(uint256 indexed intentId, address indexed moderator);
}

sol! {
    #[sol(rpc)]
    interface Approvals {
        function getIntent(uint256 intentId) external view returns (uint8 state, bytes script);
        function canForward(address sender, bytes evmScript) external view returns (bool);
        function approve(uint256 intentId) external;
        function reject(uint256 intentId) external;
    }
}
