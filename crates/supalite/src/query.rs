// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! PostgREST URL query builder.
//!
//! Accumulates a `<table>?select=...&<col>=<op>.<value>&...` string; the
//! client prefixes `<host>/rest/v1/` when the query is executed. Values are
//! appended verbatim, so callers quoting strings with reserved URL characters
//! must encode them themselves.

/// Sort direction for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
	Asc,
	Desc,
}

/// Null placement for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
	First,
	Last,
}

/// A PostgREST query under construction.
///
/// ```
/// use supalite::{Nulls, Order, Query};
///
/// let query = Query::from("orders")
/// 	.select("id,total")
/// 	.eq("status", "open")
/// 	.order("total", Order::Desc, Nulls::Last)
/// 	.limit(10);
/// assert_eq!(
/// 	query.path(),
/// 	"orders?select=id,total&status=eq.open&order=total.desc.nullslast&limit=10"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Query {
	path: String,
}

impl Query {
	/// Start a query against `table`.
	pub fn from(table: impl Into<String>) -> Self {
		Self {
			path: format!("{}?", table.into()),
		}
	}

	/// Start an update target against `table`. Same shape as [`Query::from`];
	/// kept separate so call sites read as what they do.
	pub fn update(table: impl Into<String>) -> Self {
		Self::from(table)
	}

	/// Restrict the returned columns.
	pub fn select(self, columns: &str) -> Self {
		self.append(&format!("select={columns}"))
	}

	pub fn eq(self, column: &str, value: &str) -> Self {
		self.filter(column, "eq", value)
	}

	pub fn neq(self, column: &str, value: &str) -> Self {
		self.filter(column, "neq", value)
	}

	pub fn gt(self, column: &str, value: &str) -> Self {
		self.filter(column, "gt", value)
	}

	pub fn gte(self, column: &str, value: &str) -> Self {
		self.filter(column, "gte", value)
	}

	pub fn lt(self, column: &str, value: &str) -> Self {
		self.filter(column, "lt", value)
	}

	pub fn lte(self, column: &str, value: &str) -> Self {
		self.filter(column, "lte", value)
	}

	/// `IS` check, for `null` / `true` / `false`.
	pub fn is(self, column: &str, value: &str) -> Self {
		self.filter(column, "is", value)
	}

	/// Membership in a comma-separated list of values.
	pub fn in_(self, column: &str, values: &str) -> Self {
		self.append(&format!("{column}=in.({values})"))
	}

	/// Array/range contains.
	pub fn cs(self, column: &str, values: &str) -> Self {
		self.append(&format!("{column}=cs.{{{values}}}"))
	}

	/// Array/range contained by.
	pub fn cd(self, column: &str, values: &str) -> Self {
		self.append(&format!("{column}=cd.{{{values}}}"))
	}

	/// Array/range overlap.
	pub fn ov(self, column: &str, values: &str) -> Self {
		self.append(&format!("{column}=ov.{{{values}}}"))
	}

	/// Range strictly left of.
	pub fn sl(self, column: &str, range: &str) -> Self {
		self.append(&format!("{column}=sl.({range})"))
	}

	/// Range strictly right of.
	pub fn sr(self, column: &str, range: &str) -> Self {
		self.append(&format!("{column}=sr.({range})"))
	}

	/// Range does not extend to the right of.
	pub fn nxr(self, column: &str, range: &str) -> Self {
		self.append(&format!("{column}=nxr.({range})"))
	}

	/// Range does not extend to the left of.
	pub fn nxl(self, column: &str, range: &str) -> Self {
		self.append(&format!("{column}=nxl.({range})"))
	}

	/// Range adjacency.
	pub fn adj(self, column: &str, range: &str) -> Self {
		self.append(&format!("{column}=adj.({range})"))
	}

	pub fn order(self, column: &str, direction: Order, nulls: Nulls) -> Self {
		let direction = match direction {
			Order::Asc => "asc",
			Order::Desc => "desc",
		};
		let nulls = match nulls {
			Nulls::First => "nullsfirst",
			Nulls::Last => "nullslast",
		};
		self.append(&format!("order={column}.{direction}.{nulls}"))
	}

	pub fn limit(self, count: u32) -> Self {
		self.append(&format!("limit={count}"))
	}

	pub fn offset(self, count: u32) -> Self {
		self.append(&format!("offset={count}"))
	}

	/// The accumulated `<table>?...` string, without the `/rest/v1/` prefix.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Consume the builder, yielding the accumulated string.
	pub fn into_path(self) -> String {
		self.path
	}

	fn filter(self, column: &str, op: &str, value: &str) -> Self {
		self.append(&format!("{column}={op}.{value}"))
	}

	fn append(mut self, param: &str) -> Self {
		if !self.path.ends_with('?') {
			self.path.push('&');
		}
		self.path.push_str(param);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_opens_the_query_string() {
		assert_eq!(Query::from("orders").path(), "orders?");
	}

	#[test]
	fn first_parameter_needs_no_separator() {
		assert_eq!(Query::from("orders").select("*").path(), "orders?select=*");
	}

	#[test]
	fn later_parameters_are_ampersand_separated() {
		let query = Query::from("orders").select("*").eq("id", "42");
		assert_eq!(query.path(), "orders?select=*&id=eq.42");
	}

	#[test]
	fn comparison_operators_render_postgrest_syntax() {
		assert_eq!(Query::from("t").eq("a", "1").path(), "t?a=eq.1");
		assert_eq!(Query::from("t").neq("a", "1").path(), "t?a=neq.1");
		assert_eq!(Query::from("t").gt("a", "1").path(), "t?a=gt.1");
		assert_eq!(Query::from("t").gte("a", "1").path(), "t?a=gte.1");
		assert_eq!(Query::from("t").lt("a", "1").path(), "t?a=lt.1");
		assert_eq!(Query::from("t").lte("a", "1").path(), "t?a=lte.1");
		assert_eq!(Query::from("t").is("a", "null").path(), "t?a=is.null");
	}

	#[test]
	fn list_operators_parenthesize_their_values() {
		assert_eq!(Query::from("t").in_("a", "1,2").path(), "t?a=in.(1,2)");
		assert_eq!(Query::from("t").sl("a", "1,10").path(), "t?a=sl.(1,10)");
		assert_eq!(Query::from("t").sr("a", "1,10").path(), "t?a=sr.(1,10)");
		assert_eq!(Query::from("t").nxr("a", "1,10").path(), "t?a=nxr.(1,10)");
		assert_eq!(Query::from("t").nxl("a", "1,10").path(), "t?a=nxl.(1,10)");
		assert_eq!(Query::from("t").adj("a", "1,10").path(), "t?a=adj.(1,10)");
	}

	#[test]
	fn array_operators_brace_their_values() {
		assert_eq!(Query::from("t").cs("a", "1,2").path(), "t?a=cs.{1,2}");
		assert_eq!(Query::from("t").cd("a", "1,2").path(), "t?a=cd.{1,2}");
		assert_eq!(Query::from("t").ov("a", "1,2").path(), "t?a=ov.{1,2}");
	}

	#[test]
	fn ordering_and_paging() {
		let query = Query::from("t")
			.order("a", Order::Asc, Nulls::First)
			.limit(5)
			.offset(10);
		assert_eq!(query.path(), "t?order=a.asc.nullsfirst&limit=5&offset=10");
	}

	#[test]
	fn into_path_consumes_the_builder() {
		let path = Query::from("t").select("*").into_path();
		assert_eq!(path, "t?select=*");
	}
}
