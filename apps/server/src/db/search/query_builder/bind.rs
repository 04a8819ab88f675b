use super::BindValue;
use crate::db::search::predicate::Scalar;

pub(super) fn push_text(bind_params: &mut Vec<BindValue>, value: String) -> usize {
    bind_params.push(BindValue::Text(value));
    bind_params.len()
}

pub(super) fn push_text_array(bind_params: &mut Vec<BindValue>, value: Vec<String>) -> usize {
    bind_params.push(BindValue::TextArray(value));
    bind_params.len()
}

pub(super) fn push_scalar(bind_params: &mut Vec<BindValue>, value: &Scalar) -> usize {
    bind_params.push(match value {
        Scalar::Text(s) => BindValue::Text(s.clone()),
        Scalar::Int(i) => BindValue::Int(*i),
        Scalar::Float(f) => BindValue::Float(*f),
        Scalar::Bool(b) => BindValue::Bool(*b),
    });
    bind_params.len()
}
