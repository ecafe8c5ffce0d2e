use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::Function;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("invalid function signature '{signature}': {detail}")]
    Signature { signature: String, detail: String },
    #[error("arguments do not match '{signature}': {detail}")]
    Arguments { signature: String, detail: String },
}

/// Arguments taken by the protocol's constructors and configuration methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Value {
    Address(Address),
    Bool(bool),
    Uint(U256),
}

impl Value {
    pub fn to_sol_value(&self) -> DynSolValue {
        match self {
            Value::Address(address) => DynSolValue::Address(*address),
            Value::Bool(flag) => DynSolValue::Bool(*flag),
            Value::Uint(value) => DynSolValue::Uint(*value, 256),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Address(address) => write!(f, "{}", address),
            Value::Bool(flag) => write!(f, "{}", flag),
            Value::Uint(value) => write!(f, "{}", value),
        }
    }
}

fn to_sol_values(values: &[Value]) -> Vec<DynSolValue> {
    values.iter().map(Value::to_sol_value).collect()
}

/// Calldata for `signature` (e.g. `transferOwnership(address)`): selector followed by the
/// encoded arguments, which must match the signature's parameter types.
pub fn encode_function_call(signature: &str, values: &[Value]) -> Result<Vec<u8>, AbiError> {
    let function = Function::parse(signature).map_err(|e| AbiError::Signature {
        signature: signature.to_string(),
        detail: e.to_string(),
    })?;
    function
        .abi_encode_input(&to_sol_values(values))
        .map_err(|e| AbiError::Arguments {
            signature: signature.to_string(),
            detail: e.to_string(),
        })
}

/// Creation payload: init code followed by the encoded constructor arguments.
pub fn encode_deployment(bytecode: &[u8], constructor_args: &[Value]) -> Vec<u8> {
    let mut out = bytecode.to_vec();
    out.extend(DynSolValue::Tuple(to_sol_values(constructor_args)).abi_encode_params());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex};

    const ADMIN: Address = address!("1021BB533a5c04B7F9E0cE55c9C3Cd539A7aFc95");

    #[test]
    fn encodes_calls_behind_their_selector() {
        let data = encode_function_call("transferOwnership(address)", &[Value::Address(ADMIN)])
            .unwrap();
        assert_eq!(
            hex::encode(&data),
            "f2fde38b0000000000000000000000001021bb533a5c04b7f9e0ce55c9c3cd539a7afc95"
        );

        let data = encode_function_call(
            "setRouterAllowed(address,bool)",
            &[Value::Address(ADMIN), Value::Bool(true)],
        )
        .unwrap();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 63], 1);
    }

    #[test]
    fn uint_words_span_256_bits() {
        let value = U256::MAX - U256::from(1);
        let data = encode_deployment(&[0x60, 0x80], &[Value::Uint(value)]);
        assert_eq!(&data[..2], &[0x60, 0x80]);
        assert_eq!(&data[2..33], &[0xff; 31]);
        assert_eq!(data[33], 0xfe);
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        let err = encode_function_call("transferOwnership(address)", &[Value::Bool(true)])
            .unwrap_err();
        assert!(matches!(err, AbiError::Arguments { .. }));
        assert!(matches!(
            encode_function_call("transferOwnership(", &[]),
            Err(AbiError::Signature { .. })
        ));
    }

    #[test]
    fn deployment_without_arguments_is_bare_bytecode() {
        assert_eq!(encode_deployment(&[0x60, 0x80], &[]), vec![0x60, 0x80]);
    }
}
