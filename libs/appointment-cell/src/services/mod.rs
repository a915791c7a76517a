pub mod access;
pub mod create;
pub mod detail;
pub mod filter;
pub mod listing;
pub mod report;
pub mod store;
pub mod supabase_store;

pub use access::{AccessPolicy, VisibilityScope};
pub use create::AppointmentCreateService;
pub use detail::AppointmentDetailService;
pub use filter::{AppointmentFilter, PageRequest, MAX_PAGE_LIMIT};
pub use listing::{list_cache_key, AppointmentListingService, LIST_CACHE_PATTERN};
pub use report::{group_by_date, AppointmentReportService};
pub use store::{AppointmentStore, InMemoryAppointmentStore, StoreError};
pub use supabase_store::SupabaseAppointmentStore;
