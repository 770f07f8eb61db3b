//! Autograd operations with backward passes

use super::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Lower bound applied to each log term of binary cross-entropy
pub const BCE_LOG_CLAMP: f32 = -100.0;

/// Floor on `p * (1 - p)` in the binary cross-entropy gradient
const BCE_GRAD_EPS: f32 = 1e-12;

fn assert_same_shape(a: &Tensor, b: &Tensor, op: &str) {
    assert_eq!(
        a.shape(),
        b.shape(),
        "{op}: shape mismatch {:?} vs {:?}",
        a.shape(),
        b.shape()
    );
}

/// Add two tensors
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape(a, b, "add");
    let data = a.data() + b.data();
    let requires_grad = a.requires_grad() || b.requires_grad();

    let mut result = Tensor::with_shape(data, a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            negate_b: false,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Subtract `b` from `a` element-wise
pub fn sub(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape(a, b, "sub");
    let data = a.data() - b.data();
    let requires_grad = a.requires_grad() || b.requires_grad();

    let mut result = Tensor::with_shape(data, a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            negate_b: true,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    negate_b: bool,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                if self.negate_b {
                    self.b.accumulate_grad(-grad);
                } else {
                    self.b.accumulate_grad(grad.clone());
                }
            }
        }
    }
}

/// Multiply two tensors element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Tensor {
    assert_same_shape(a, b, "mul");
    let data = a.data() * b.data();
    let requires_grad = a.requires_grad() || b.requires_grad();

    let mut result = Tensor::with_shape(data, a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MulBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MulBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for MulBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * b
                self.a.accumulate_grad(grad * self.b.data());
            }
            if self.b.requires_grad() {
                // ∂L/∂b = ∂L/∂out * a
                self.b.accumulate_grad(grad * self.a.data());
            }
        }
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = a.data() * factor;
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data, a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ScaleBackward {
            a: a.clone(),
            factor,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * self.factor);
            }
        }
    }
}

/// Element-wise exponential
pub fn exp(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::exp);
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data.clone(), a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ExpBackward {
            a: a.clone(),
            output: data,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ExpBackward {
    a: Tensor,
    output: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for ExpBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂exp(a)/∂a = exp(a)
                self.a.accumulate_grad(grad * &self.output);
            }
        }
    }
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0));
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data, a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReluBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReluBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * (a > 0)
                let mask = self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
                self.a.accumulate_grad(grad * &mask);
            }
        }
    }
}

/// Logistic sigmoid, bounding outputs to (0, 1)
///
/// σ(x) = 1 / (1 + e^(-x)), evaluated without overflow for large |x|
pub fn sigmoid(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| {
        if x >= 0.0 {
            1.0 / (1.0 + (-x).exp())
        } else {
            let e = x.exp();
            e / (1.0 + e)
        }
    });
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data.clone(), a.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SigmoidBackward {
            a: a.clone(),
            output: data,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SigmoidBackward {
    a: Tensor,
    output: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for SigmoidBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂σ/∂x = σ(x) * (1 - σ(x))
                let local = self.output.mapv(|s| s * (1.0 - s));
                self.a.accumulate_grad(grad * &local);
            }
        }
    }
}

/// Sum all elements into a scalar
pub fn sum(a: &Tensor) -> Tensor {
    let data = Array1::from(vec![a.data().sum()]);
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data, Vec::new(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SumBackward {
            a: a.clone(),
            factor: 1.0,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Mean of all elements as a scalar
pub fn mean(a: &Tensor) -> Tensor {
    let n = a.len().max(1) as f32;
    let data = Array1::from(vec![a.data().sum() / n]);
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data, Vec::new(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SumBackward {
            a: a.clone(),
            factor: 1.0 / n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SumBackward {
    a: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for SumBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂sum * factor (broadcast)
                let grad_val = grad[0] * self.factor;
                self.a.accumulate_grad(Array1::from_elem(self.a.len(), grad_val));
            }
        }
    }
}

/// Sum over the trailing axis: `[..., D] -> [...]`
pub fn sum_last_axis(a: &Tensor) -> Tensor {
    let (&d, lead) = a
        .shape()
        .split_last()
        .unwrap_or_else(|| panic!("sum_last_axis: scalar input"));
    let rows = lead.iter().product::<usize>();

    let data: Array1<f32> = (0..rows)
        .map(|r| a.data().slice(ndarray::s![r * d..(r + 1) * d]).sum())
        .collect();
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(data, lead.to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SumLastAxisBackward {
            a: a.clone(),
            d,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SumLastAxisBackward {
    a: Tensor,
    d: usize,
    result_grad: GradCell,
}

impl BackwardOp for SumLastAxisBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                let grad_a: Array1<f32> = (0..self.a.len()).map(|i| grad[i / self.d]).collect();
                self.a.accumulate_grad(grad_a);
            }
        }
    }
}

/// Reinterpret a tensor with a new shape of the same element count
pub fn reshape(a: &Tensor, shape: &[usize]) -> Tensor {
    let requires_grad = a.requires_grad();
    let mut result = Tensor::with_shape(a.data().clone(), shape.to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReshapeBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReshapeBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReshapeBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
        }
    }
}

/// Repeat each row across a new sample axis: `[B, L] -> [B, n, L]`
pub fn broadcast_samples(a: &Tensor, n: usize) -> Tensor {
    assert_eq!(a.ndim(), 2, "broadcast_samples: expected [B, L], got {:?}", a.shape());
    let (b, l) = (a.shape()[0], a.shape()[1]);

    let mut data = Vec::with_capacity(b * n * l);
    for row in 0..b {
        let src = a.data().slice(ndarray::s![row * l..(row + 1) * l]);
        for _ in 0..n {
            data.extend(src.iter().copied());
        }
    }
    let requires_grad = a.requires_grad();

    let mut result = Tensor::with_shape(Array1::from(data), vec![b, n, l], requires_grad);

    if requires_grad {
        let backward_op = Rc::new(BroadcastSamplesBackward {
            a: a.clone(),
            n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct BroadcastSamplesBackward {
    a: Tensor,
    n: usize,
    result_grad: GradCell,
}

impl BackwardOp for BroadcastSamplesBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // Each source row receives the sum over its sample copies
                let (b, l) = (self.a.shape()[0], self.a.shape()[1]);
                let mut grad_a = Array1::<f32>::zeros(b * l);
                for row in 0..b {
                    for s in 0..self.n {
                        let offset = (row * self.n + s) * l;
                        for j in 0..l {
                            grad_a[row * l + j] += grad[offset + j];
                        }
                    }
                }
                self.a.accumulate_grad(grad_a);
            }
        }
    }
}

/// Matrix multiplication
///
/// Computes C = A @ B where:
/// - A is m×k (flattened to length m*k)
/// - B is k×n (flattened to length k*n)
/// - C is m×n, returned with shape `[m, n]`
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Tensor {
    assert_eq!(a.len(), m * k, "Matrix A size mismatch");
    assert_eq!(b.len(), k * n, "Matrix B size mismatch");

    let a_mat = a.data().view().into_shape_with_order((m, k));
    let b_mat = b.data().view().into_shape_with_order((k, n));
    let result_data: Array1<f32> = match (a_mat, b_mat) {
        (Ok(a_mat), Ok(b_mat)) => a_mat.dot(&b_mat).iter().copied().collect(),
        _ => unreachable!("sizes are asserted above"),
    };

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::with_shape(result_data, vec![m, n], requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: GradCell,
}

impl BackwardOp for MatmulBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone(), self.b.clone()]
    }

    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            // ∂L/∂A = ∂L/∂C @ B^T
            // ∂L/∂B = A^T @ ∂L/∂C
            let (m, k, n) = (self.m, self.k, self.n);

            if self.a.requires_grad() {
                let mut grad_a = Array1::<f32>::zeros(m * k);
                for i in 0..m {
                    for p in 0..k {
                        let mut sum = 0.0;
                        for j in 0..n {
                            sum += grad_output[i * n + j] * self.b.data()[p * n + j];
                        }
                        grad_a[i * k + p] = sum;
                    }
                }
                self.a.accumulate_grad(grad_a);
            }

            if self.b.requires_grad() {
                let mut grad_b = Array1::<f32>::zeros(k * n);
                for i in 0..m {
                    for p in 0..k {
                        let a_ip = self.a.data()[i * k + p];
                        if a_ip == 0.0 {
                            continue;
                        }
                        for j in 0..n {
                            grad_b[p * n + j] += a_ip * grad_output[i * n + j];
                        }
                    }
                }
                self.b.accumulate_grad(grad_b);
            }
        }
    }
}

/// Add a bias row to every row of `x`: `[n, d] + [d] -> [n, d]`
pub fn add_bias(x: &Tensor, bias: &Tensor) -> Tensor {
    assert_eq!(x.ndim(), 2, "add_bias: expected [n, d], got {:?}", x.shape());
    let d = x.shape()[1];
    assert_eq!(bias.len(), d, "add_bias: bias length must match {d}");

    let mut data = x.data().clone();
    for (i, val) in data.iter_mut().enumerate() {
        *val += bias.data()[i % d];
    }
    let requires_grad = x.requires_grad() || bias.requires_grad();

    let mut result = Tensor::with_shape(data, x.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBiasBackward {
            x: x.clone(),
            bias: bias.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBiasBackward {
    x: Tensor,
    bias: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for AddBiasBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.x.clone(), self.bias.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            if self.bias.requires_grad() {
                // Bias gradient is the column sum over rows
                let d = self.bias.len();
                let mut grad_b = Array1::<f32>::zeros(d);
                for (i, &g) in grad.iter().enumerate() {
                    grad_b[i % d] += g;
                }
                self.bias.accumulate_grad(grad_b);
            }
        }
    }
}

/// Element-wise binary cross-entropy, unreduced
///
/// BCE(p, t) = -(t·ln p + (1 - t)·ln(1 - p)), each log clamped to ≥ -100 so
/// saturated predictions stay finite. Targets are treated as constants.
pub fn binary_cross_entropy(pred: &Tensor, target: &Tensor) -> Tensor {
    assert_same_shape(pred, target, "binary_cross_entropy");

    let data: Array1<f32> = pred
        .data()
        .iter()
        .zip(target.data().iter())
        .map(|(&p, &t)| {
            let log_p = p.ln().max(BCE_LOG_CLAMP);
            let log_1mp = (1.0 - p).ln().max(BCE_LOG_CLAMP);
            -(t * log_p + (1.0 - t) * log_1mp)
        })
        .collect();
    let requires_grad = pred.requires_grad();

    let mut result = Tensor::with_shape(data, pred.shape().to_vec(), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(BceBackward {
            pred: pred.clone(),
            target: target.data().clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct BceBackward {
    pred: Tensor,
    target: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for BceBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.pred.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            // ∂BCE/∂p = (p - t) / (p(1 - p))
            let grad_p: Array1<f32> = self
                .pred
                .data()
                .iter()
                .zip(self.target.iter())
                .zip(grad.iter())
                .map(|((&p, &t), &g)| g * (p - t) / (p * (1.0 - p)).max(BCE_GRAD_EPS))
                .collect();
            self.pred.accumulate_grad(grad_p);
        }
    }
}

/// One latent dimension's contribution to KL(N(μ, σ²) ‖ N(0, 1))
///
/// 0.5·(e^lv + μ² - 1 - lv), evaluated via `exp_m1` so the result never
/// rounds below zero for small |lv|.
pub fn standard_normal_kl_term(mean: f32, log_var: f32) -> f32 {
    0.5 * (log_var.exp_m1() - log_var + mean * mean)
}

/// Closed-form KL divergence of diagonal Gaussians against N(0, I)
///
/// `mean` and `log_var` are `[B, L]`; the result is `[B]`, summed over the
/// latent dimensions.
pub fn gaussian_kl(mean: &Tensor, log_var: &Tensor) -> Tensor {
    assert_same_shape(mean, log_var, "gaussian_kl");
    assert_eq!(mean.ndim(), 2, "gaussian_kl: expected [B, L], got {:?}", mean.shape());
    let (b, l) = (mean.shape()[0], mean.shape()[1]);

    let data: Array1<f32> = (0..b)
        .map(|row| {
            (0..l)
                .map(|j| {
                    let idx = row * l + j;
                    standard_normal_kl_term(mean.data()[idx], log_var.data()[idx])
                })
                .sum::<f32>()
        })
        .collect();
    let requires_grad = mean.requires_grad() || log_var.requires_grad();

    let mut result = Tensor::with_shape(data, vec![b], requires_grad);

    if requires_grad {
        let backward_op = Rc::new(GaussianKlBackward {
            mean: mean.clone(),
            log_var: log_var.clone(),
            latent_dim: l,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct GaussianKlBackward {
    mean: Tensor,
    log_var: Tensor,
    latent_dim: usize,
    result_grad: GradCell,
}

impl BackwardOp for GaussianKlBackward {
    fn inputs(&self) -> Vec<Tensor> {
        vec![self.mean.clone(), self.log_var.clone()]
    }

    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            let l = self.latent_dim;
            if self.mean.requires_grad() {
                // ∂KL/∂μ = μ
                let grad_mean: Array1<f32> = self
                    .mean
                    .data()
                    .iter()
                    .enumerate()
                    .map(|(i, &m)| grad[i / l] * m)
                    .collect();
                self.mean.accumulate_grad(grad_mean);
            }
            if self.log_var.requires_grad() {
                // ∂KL/∂lv = 0.5·(e^lv - 1)
                let grad_log_var: Array1<f32> = self
                    .log_var
                    .data()
                    .iter()
                    .enumerate()
                    .map(|(i, &lv)| grad[i / l] * 0.5 * lv.exp_m1())
                    .collect();
                self.log_var.accumulate_grad(grad_log_var);
            }
        }
    }
}
