//! ERC-4337 UserOperation model and EntryPoint call encoding.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};

mod abi {
    use alloy::sol;

    sol! {
        /// EntryPoint v0.6 user operation layout.
        #[derive(Debug)]
        struct UserOperation {
            address sender;
            uint256 nonce;
            bytes initCode;
            bytes callData;
            uint256 callGasLimit;
            uint256 verificationGasLimit;
            uint256 preVerificationGas;
            uint256 maxFeePerGas;
            uint256 maxPriorityFeePerGas;
            bytes paymasterAndData;
            bytes signature;
        }

        function handleOps(UserOperation[] ops, address payable beneficiary);
    }
}

/// A user operation as received on the wire.
///
/// Field names follow the JSON-RPC camelCase convention; quantities are
/// hex-encoded like every other Ethereum RPC payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl From<&UserOperation> for abi::UserOperation {
    fn from(op: &UserOperation) -> Self {
        Self {
            sender: op.sender,
            nonce: op.nonce,
            initCode: op.init_code.clone(),
            callData: op.call_data.clone(),
            callGasLimit: op.call_gas_limit,
            verificationGasLimit: op.verification_gas_limit,
            preVerificationGas: op.pre_verification_gas,
            maxFeePerGas: op.max_fee_per_gas,
            maxPriorityFeePerGas: op.max_priority_fee_per_gas,
            paymasterAndData: op.paymaster_and_data.clone(),
            signature: op.signature.clone(),
        }
    }
}

/// ABI-encode `handleOps([op], beneficiary)` for the EntryPoint contract.
pub fn encode_handle_ops(op: &UserOperation, beneficiary: Address) -> Bytes {
    let call = abi::handleOpsCall {
        ops: vec![op.into()],
        beneficiary,
    };
    call.abi_encode().into()
}
