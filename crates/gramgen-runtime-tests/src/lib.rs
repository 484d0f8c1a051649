//! Parsers generated by the build script, exercised on token streams.

#[cfg(test)]
mod g_arithmetic;
#[cfg(test)]
mod g_bracketed;
#[cfg(test)]
mod g_postfix;
#[cfg(test)]
mod g_statements;
