pub mod category_service;
pub mod reserve_service;
pub mod summary_service;
pub mod transaction_service;

pub use category_service::CategoryService;
pub use reserve_service::{CumulativeSummary, EmergencyFundStatus, ReservePoint, ReserveService};
pub use summary_service::{
    CalendarMonth, DaySummary, MonthTotals, PeriodComparison, ReportPeriod, Summary,
    SummaryService,
};
pub use transaction_service::{
    search_occurrences, sort_occurrences, SeriesScope, SortDirection, SortField,
    TransactionService,
};
