//! Background project indexer: a worker pool fed by file-spec
//! queries, reporting progress through the work-done progress bar and
//! feeding discovered symbols to the parser/library-manager collaborators.

pub mod collaborators;
pub mod compass;
pub mod explorer;
pub mod filelist;
pub mod filespec;
pub mod project;
pub mod worker;
