pub mod qmm;
