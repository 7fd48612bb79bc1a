/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix
//!
//! A FIX session-layer protocol engine for Rust, covering FIX 4.0 through
//! 5.0 over FIXT 1.1.
//!
//! Ferrofix implements the session layer of the FIX protocol: framing,
//! parsing, sequence-number accounting, heartbeats, logon/logout, resend
//! recovery, session scheduling, and safe hand-off of application messages
//! to user code. It works both as an **initiator** (dialing a counterparty)
//! and an **acceptor** (answering inbound logons).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrofix::prelude::*;
//!
//! let settings = Settings::from_toml(r#"
//! [default]
//! begin_string = "FIX.4.4"
//! sender_comp_id = "BANK"
//!
//! [session.exchange]
//! target_comp_id = "EXCH"
//! heart_bt_int = 30
//! "#)?;
//!
//! let engine = EngineBuilder::new()
//!     .with_application(my_application)
//!     .with_settings(&settings)?
//!     .start()?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: errors, tags, field maps, messages, session identities
//! - [`codec`]: tag=value wire encoding and decoding
//! - [`dictionary`]: FIX version table, tag classification, validation
//! - [`store`]: message persistence (memory and file backed)
//! - [`session`]: the session state machine and actor
//! - [`engine`]: registry, routing, and engine lifecycle
//! - [`transport`]: stream framing

pub mod core {
    //! Errors, tags, field maps, messages, and session identities.
    pub use ferrofix_core::*;
}

pub mod codec {
    //! Tag=value wire encoding and decoding.
    pub use ferrofix_codec::*;
}

pub mod dictionary {
    //! FIX version table, tag classification, and validation.
    pub use ferrofix_dictionary::*;
}

pub mod store {
    //! Message persistence.
    pub use ferrofix_store::*;
}

pub mod session {
    //! Session state machine and actor.
    pub use ferrofix_session::*;
}

pub mod engine {
    //! Registry, routing, and engine lifecycle.
    pub use ferrofix_engine::*;
}

pub mod transport {
    //! Stream framing.
    pub use ferrofix_transport::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ferrofix_core::{
        CompId, ConfigError, DecodeError, EncodeError, Field, FieldMap, FixError, Message,
        MessageRejectError, MsgType, RejectReason, Result, SeqNum, SessionError, SessionId,
        StoreError, Timestamp,
    };

    pub use ferrofix_codec::{MessageDecoder, encode_message};

    pub use ferrofix_dictionary::{Dictionary, TagClassifier, Version};

    pub use ferrofix_store::{FileStore, MemoryStore, MessageStore};

    pub use ferrofix_session::{
        Application, DoNotSend, Event, FixIn, HeartbeatClock, NoOpApplication, NullLog, Session,
        SessionConfig, SessionHandle, SessionLog, SessionSchedule, SessionState, Settings,
        TracingLog,
    };

    pub use ferrofix_engine::{Engine, EngineBuilder, MessageRouter, SessionRegistry};

    pub use ferrofix_transport::{FixFramer, FramerError};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_imports_resolve() {
        let _seq = SeqNum::new(1);
        let _version = Version::Fix44;
        let _schedule = SessionSchedule::always_open();
        assert_eq!(Version::Fix42.begin_string(), "FIX.4.2");
    }

    #[test]
    fn identity_types_compose() {
        let id = SessionId::new(
            "FIX.4.4",
            CompId::new("BANK").unwrap(),
            CompId::new("EXCH").unwrap(),
        );
        assert_eq!(id.to_string(), "FIX.4.4:BANK->EXCH");
    }
}
