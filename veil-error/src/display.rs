// Copyright (C) 2024-2026  The Veil Project.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// Display writes only the top-level error message.
impl<E> std::fmt::Display for crate::Error<E>
where
    E: crate::CoreError,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

// Debug renders the whole chain as a JSON object, one `source` level per
// propagation step, so log lines stay machine-splittable.
impl<E> std::fmt::Debug for crate::Error<E>
where
    E: crate::CoreError,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;

        write!(f, "\"error\":{}", json_escape(&self.error.to_string()))?;

        if !self.context.is_empty() {
            write!(f, ",\"context\":[")?;
            for (position, context) in self.context.iter().enumerate() {
                if position > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", json_escape(&context.to_string()))?;
            }
            write!(f, "]")?;
        }

        if let Some(source) = &self.source {
            write!(f, ",\"source\":")?;
            match source {
                crate::ErrorSource::Known(source) => write!(f, "{:?}", source)?,
                crate::ErrorSource::Foreign(source) => debug_foreign_error(source.as_ref(), f)?,
            }
        }

        write!(f, "}}")
    }
}

fn debug_foreign_error(
    error: &dyn std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    write!(f, "{{")?;
    write!(f, "\"error\":{}", json_escape(&format!("{:?}", error)))?;

    if let Some(source) = error.source() {
        write!(f, ",\"source\":")?;
        debug_foreign_error(source, f)?;
    }

    write!(f, "}}")
}

fn json_escape(value: &str) -> String {
    serde_json::json!(value).to_string()
}
