pub mod analytics;
pub mod dashboard;
pub mod leaderboard;

pub use dashboard::{DashboardSummary, WeeklyDashboard};
pub use leaderboard::group_leaderboard;
