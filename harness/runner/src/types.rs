/// Recommended error type for suite `main` functions and glue code built on
/// the runner. Compatible with `?` over everything the runner returns.
pub type ParleyResult<T> = anyhow::Result<T>;
