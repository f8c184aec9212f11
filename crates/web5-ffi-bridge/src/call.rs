//! The call envelope.
//!
//! Every native entry point takes a [`CallStatus`] out-parameter. After
//! the call returns, the status decides what the primary return value means:
//!
//! | code | meaning | handling |
//! |------|---------|----------|
//! | 0 | success | return value is valid, any `error_buf` is freed unread |
//! | 1 | domain error | lift `error_buf` as the declared error type |
//! | 2 | native panic | raise [`BridgeFault::NativePanic`] (or the fixed fault if empty) |
//! | other | protocol violation | raise [`BridgeFault::UnknownStatusCode`] |
//!
//! Calls are synchronous. There is no timeout and no cancellation: a native
//! call that hangs hangs the calling thread.

use tracing::trace;
use web5_wire::Wire;

use crate::buffer::{OwnedBuffer, TransferBuffer};
use crate::fault::{raise, BridgeFault};
use crate::native::NativeCore;
use crate::status::{CallStatus, CallStatusCode};

impl NativeCore {
    /// Invokes an entry point that declares no error type.
    ///
    /// An error status from such an entry point is itself a fault.
    pub fn call<T>(&self, f: impl FnOnce(*mut CallStatus) -> T) -> T {
        let mut status = CallStatus::default();
        let value = f(&mut status);
        match status.code() {
            Some(CallStatusCode::Success) => {
                drop(OwnedBuffer::new(self, status.error_buf));
                value
            }
            Some(CallStatusCode::Error) => {
                drop(OwnedBuffer::new(self, status.error_buf));
                raise(BridgeFault::UnexpectedError)
            }
            Some(CallStatusCode::Panic) => self.raise_native_panic(status.error_buf),
            None => raise(BridgeFault::UnknownStatusCode(status.code)),
        }
    }

    /// Invokes an entry point whose errors are wire-encoded `E` values.
    pub fn call_with_error<T, E: Wire>(
        &self,
        f: impl FnOnce(*mut CallStatus) -> T,
    ) -> Result<T, E> {
        let mut status = CallStatus::default();
        let value = f(&mut status);
        match status.code() {
            Some(CallStatusCode::Success) => {
                drop(OwnedBuffer::new(self, status.error_buf));
                Ok(value)
            }
            Some(CallStatusCode::Error) => {
                trace!(code = status.code, "native call returned a domain error");
                Err(self.lift::<E>(status.error_buf))
            }
            Some(CallStatusCode::Panic) => self.raise_native_panic(status.error_buf),
            None => raise(BridgeFault::UnknownStatusCode(status.code)),
        }
    }

    fn raise_native_panic(&self, message_buf: TransferBuffer) -> ! {
        if message_buf.is_empty() {
            drop(OwnedBuffer::new(self, message_buf));
            raise(BridgeFault::PanicWhileHandlingPanic)
        }
        let message = self.lift::<String>(message_buf);
        raise(BridgeFault::NativePanic(message))
    }
}
