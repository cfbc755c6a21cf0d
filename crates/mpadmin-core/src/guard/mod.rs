//! Route guard for the admin dashboard.
//!
//! This module provides:
//! - `RoutePolicy`: the static route → roles table and sidebar entries
//! - `authorize` / `RouteGuard`: the pure render-or-redirect decision
//! - `GuardedRoute`, `RedirectEffect`: performing that redirect once per change
//! - `Navigation`, `NoticeSlot`: redirect targets and the one-time notice
//!   shown on the fallback page

pub mod decision;
pub mod effect;
pub mod navigation;
pub mod notice;
pub mod policy;

pub use decision::{authorize, Decision, RouteGuard};
pub use effect::{GuardedRoute, Navigator, RecordingNavigator, RedirectEffect};
pub use navigation::{resolve_return_path, Navigation, DEFAULT_LANDING_PATH, FALLBACK_PATH, LOGIN_PATH};
pub use notice::{FallbackNotice, NoticeSlot, DEFAULT_NOTICE};
pub use policy::{NavItem, RoutePolicy, RouteRule, ADMIN_POLICY};
