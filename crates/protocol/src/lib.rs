//! Wire types for the web-view JSON-RPC bridge.
//!
//! Web content and native code exchange JSON-RPC 2.0 envelopes over one
//! string channel per service. This crate holds everything that crosses that
//! channel:
//!
//! - **Envelopes**: request, result, error, and unsolicited event shapes
//! - **Requests**: closed per-service enums discriminated by `method`
//! - **Results**: one closed enum discriminated by `type`
//! - **Events**: `deviceInfo` and `notify` pushes from the BLE service
//! - **Codec**: lenient request decoding and the script wrapper used to
//!   deliver envelopes into the web content
//!
//! # Message Shapes
//!
//! ```text
//! request  {"jsonrpc":"2.0","id":1,"method":"connectGATT","params":{...}}
//! result   {"jsonrpc":"2.0","id":1,"result":{"type":"ConnectResult",...}}
//! error    {"jsonrpc":"2.0","id":1,"error":{"code":-32099,"message":"..."}}
//! event    {"jsonrpc":"2.0","method":"notify","params":{...}}
//! ```

pub mod codec;
pub mod envelope;
pub mod error_code;
pub mod event;
pub mod header;
pub mod request;
pub mod result;

pub use codec::{
	DecodeError, DecodeErrorKind, DecodedRequest, decode_request, dispatch_script, encode_error, encode_event, encode_result,
};
pub use envelope::{ErrorEnvelope, ErrorObject, EventEnvelope, JSONRPC_VERSION, RequestId, ResultEnvelope};
pub use error_code::ErrorCode;
pub use event::{BleEvent, DeviceInfoParams, NotifyParams};
pub use header::HeaderRule;
pub use request::{
	AddressParams, BleRequest, CharacteristicParams, EmptyParams, OAuthParams, OAuthRequest, RpcRequest,
	WriteCharacteristicParams,
};
pub use result::{GattCharacteristicInfo, GattServiceInfo, RpcResult};
