use burn::tensor::{backend::Backend, Bool, Data, ElementConversion, Int, Shape, Tensor};

/// Build a [batch_size, seq_length] integer tensor from rows that are already padded
pub fn int_rows<B: Backend>(
    rows: Vec<Vec<i64>>,
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = rows.len();

    let values: Vec<B::IntElem> = rows.into_iter().flatten().map(|e| e.elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new([batch_size, seq_length])), device)
}

/// Build a [batch_size, seq_length] boolean tensor from rows that are already padded
pub fn bool_rows<B: Backend>(
    rows: Vec<Vec<bool>>,
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Bool> {
    let batch_size = rows.len();

    let values: Vec<bool> = rows.into_iter().flatten().collect();

    Tensor::from_data(Data::new(values, Shape::new([batch_size, seq_length])), device)
}
