//! # Audio Module
//!
//! Queueing and playback sequencing for every guild the bot is in.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue Store
//! - Pending track URLs per guild, FIFO with front reinsertion
//!
//! ### [`controller`] - Playback Controller
//! - One message-driven loop per guild: play, pause, resume, skip,
//!   restart, stop, advance on completion, idle disconnect
//!
//! ### [`transport`] / [`voice`] - Voice Transport
//! - Traits the controller drives, and their songbird implementation
//!
//! ### [`notice`] - Notifications
//! - Events users hear about without asking (now playing, idle leave, failures)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use queuecast::audio::controller::PlayRequest;
//! # async fn example(controller: &queuecast::audio::controller::PlaybackController) -> anyhow::Result<()> {
//! use serenity::all::{ChannelId, GuildId};
//!
//! let player = controller.handle(GuildId::new(123456789));
//! player
//!     .play(PlayRequest {
//!         url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
//!         voice_channel: Some(ChannelId::new(1)),
//!         text_channel: ChannelId::new(2),
//!     })
//!     .await?;
//! player.pause().await?;
//! player.resume().await?;
//! player.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod notice;
pub mod queue;
pub mod transport;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;
