mod minimal_jdk_subtyping;
