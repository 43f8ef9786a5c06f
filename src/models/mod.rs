pub mod alert;
pub mod announcement;
pub mod notification;
pub mod quote;
pub mod user;

pub use alert::{Alert, AlertKind, AlertStatus, TrackedValues};
pub use announcement::{
    CreateDividendRequest, CreateIpoRequest, DividendAnnouncement, DividendStatus,
    IpoAnnouncement, IpoStatus,
};
pub use notification::{AlertEvent, DividendPhase, IpoPhase, NotificationRequest};
pub use quote::{DividendStock, DividendYieldResponse, Equity, LiveStock, Quote, StockDetails};
pub use user::{User, UserPreferences};
