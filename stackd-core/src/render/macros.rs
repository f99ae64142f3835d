//! Macro evaluator: closed registry of generator functions.
//!
//! Macros synthesize values (typically secrets) at render time. The registry
//! is a closed enum of known generators with declared arity; nothing outside
//! it can be invoked, so template authors never get arbitrary code
//! evaluation.

use crate::error::{Result, StackdError};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde_json::Value;

/// Charset for `generate_password`.
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Upper bound on generated value length. Rejects runaway allocations from
/// mistyped template literals.
const MAX_GENERATED_LEN: u64 = 4096;

/// Known generator macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Macro {
    /// `generate_password(length)`: alphanumeric password from the OS CSPRNG.
    GeneratePassword,

    /// `generate_secret(length)`: lowercase hex string from random bytes.
    GenerateSecret,
}

impl Macro {
    /// Look up a macro by name. Anything unregistered is rejected.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "generate_password" => Ok(Self::GeneratePassword),
            "generate_secret" => Ok(Self::GenerateSecret),
            _ => Err(StackdError::UnknownMacro { name: name.to_string() }),
        }
    }

    /// Macro name, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GeneratePassword => "generate_password",
            Self::GenerateSecret => "generate_secret",
        }
    }

    /// Declared argument count.
    pub fn arity(&self) -> usize {
        match self {
            Self::GeneratePassword | Self::GenerateSecret => 1,
        }
    }

    /// Invoke the macro with raw argument literals.
    ///
    /// Every invocation draws fresh randomness; the evaluator keeps no state
    /// between calls, including repeated calls with identical arguments.
    pub fn invoke(&self, args: &[String]) -> Result<Value> {
        if args.len() != self.arity() {
            return Err(StackdError::MacroArgument {
                name: self.name().to_string(),
                reason: format!("expected {} argument(s), got {}", self.arity(), args.len()),
            });
        }

        match self {
            Self::GeneratePassword => {
                let length = parse_length(self.name(), &args[0])?;
                Ok(Value::String(generate_password(length as usize)))
            }
            Self::GenerateSecret => {
                let length = parse_length(self.name(), &args[0])?;
                Ok(Value::String(generate_secret(length as usize)))
            }
        }
    }
}

/// Parse a length argument: a positive integer literal within bounds.
fn parse_length(macro_name: &str, raw: &str) -> Result<u64> {
    let length: u64 = raw.parse().map_err(|_| StackdError::MacroArgument {
        name: macro_name.to_string(),
        reason: format!("length must be a positive integer literal, got '{}'", raw),
    })?;

    if length == 0 {
        return Err(StackdError::MacroArgument {
            name: macro_name.to_string(),
            reason: "length must be greater than zero".to_string(),
        });
    }

    if length > MAX_GENERATED_LEN {
        return Err(StackdError::MacroArgument {
            name: macro_name.to_string(),
            reason: format!("length must be at most {}", MAX_GENERATED_LEN),
        });
    }

    Ok(length)
}

/// Generate an alphanumeric password of exactly `length` characters.
fn generate_password(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

/// Generate a lowercase hex secret of exactly `length` characters.
///
/// Odd lengths round the byte count up and truncate the hex encoding, so the
/// final character still comes from a full random byte.
fn generate_secret(length: usize) -> String {
    let byte_len = length.div_ceil(2);
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);

    let mut hex = String::with_capacity(byte_len * 2);
    for b in &bytes {
        hex.push_str(&format!("{:02x}", b));
    }
    hex.truncate(length);
    hex
}
