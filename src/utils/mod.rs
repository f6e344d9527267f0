pub mod leave_type_cache;
