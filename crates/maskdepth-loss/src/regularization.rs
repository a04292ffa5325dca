//! L1 parameter regularization.

use burn::{
    module::{Module, ModuleVisitor, ParamId},
    tensor::{backend::Backend, Tensor},
};

struct AbsoluteSum<B: Backend> {
    total: Option<Tensor<B, 1>>,
}

impl<B: Backend> ModuleVisitor<B> for AbsoluteSum<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        let sum = tensor.clone().abs().sum();
        self.total = Some(match self.total.take() {
            Some(total) => total + sum,
            None => sum,
        });
    }
}

/// Sum of the absolute values of every float parameter of `module`.
///
/// Running statistics (e.g. batch norm means) are not parameters and are
/// skipped. Returns a zero tensor of shape `[1]` for a module without
/// parameters.
pub fn l1_penalty<B: Backend, M: Module<B>>(module: &M, device: &B::Device) -> Tensor<B, 1> {
    let mut visitor = AbsoluteSum { total: None };
    module.visit(&mut visitor);
    visitor
        .total
        .unwrap_or_else(|| Tensor::zeros([1], device))
}

#[cfg(test)]
mod tests {
    use burn::{
        module::Param,
        nn::{Linear, LinearConfig},
        tensor::{cast::ToElement, TensorData},
    };

    use super::*;
    use crate::tests::{TestAutodiffBackend, TestBackend};

    fn linear<B: Backend>(device: &B::Device) -> Linear<B> {
        let mut linear = LinearConfig::new(2, 2).init(device);
        linear.weight = Param::from_tensor(Tensor::from_data(
            TensorData::from([[1.0, -2.0], [0.5, -0.5]]),
            device,
        ));
        linear.bias = Some(Param::from_tensor(Tensor::from_data(
            TensorData::from([-1.0, 3.0]),
            device,
        )));
        linear
    }

    #[test]
    fn l1_penalty_sums_absolute_parameters() {
        let device = Default::default();
        let model = linear::<TestBackend>(&device);

        let penalty = l1_penalty(&model, &device).into_scalar().to_f64();

        // 1 + 2 + 0.5 + 0.5 + 1 + 3
        assert!((penalty - 8.0).abs() < 1e-6);
    }

    #[test]
    fn l1_penalty_without_parameters_is_zero() {
        let device = Default::default();
        let model = LinearConfig::new(2, 2).with_bias(false).init::<TestBackend>(&device);
        let empty: Vec<Linear<TestBackend>> = Vec::new();

        let penalty = l1_penalty(&empty, &device).into_scalar().to_f64();

        assert_eq!(penalty, 0.0);
        assert!(l1_penalty(&model, &device).into_scalar().to_f64() > 0.0);
    }

    #[test]
    fn l1_penalty_is_differentiable() {
        let device = Default::default();
        let model = linear::<TestAutodiffBackend>(&device);

        let grads = l1_penalty(&model, &device).backward();

        let weight_grad = model.weight.grad(&grads).map(|g| g.into_data());
        assert_eq!(
            weight_grad.map(|d| d.to_vec::<f32>().unwrap()),
            Some(vec![1.0, -1.0, 1.0, -1.0])
        );
    }
}
