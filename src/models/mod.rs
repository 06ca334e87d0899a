pub mod goal;
pub mod group;
pub mod habit;
pub mod profile;
pub mod study_session;
pub mod subject;

pub use goal::{GOAL_PERIODS, GOAL_TYPES, GOAL_UNITS, Goal, NewGoalRequest, UpdateGoalRequest};
pub use group::{
    GroupLeaderboardResponse, GroupMembership, JoinGroupResponse, LeaderboardEntry,
    NewGroupRequest, StudyGroup, UpdateGroupRequest,
};
pub use habit::{Habit, HabitLog, NewHabitLogRequest, NewHabitRequest, UpdateHabitRequest};
pub use profile::{Profile, UpsertProfileRequest};
pub use study_session::{NewStudySessionRequest, StudySession, UpdateStudySessionRequest};
pub use subject::{NewSubjectRequest, Subject, UpdateSubjectRequest};
